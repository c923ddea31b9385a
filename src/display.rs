//! Contract between the launcher core and the rendering layer.
//!
//! The core never lays out or draws anything; it pushes the current
//! selection and game record into whatever implements [`DisplaySink`] and
//! moves on. The production kiosk front end implements this over its scene
//! graph; [`TracingDisplay`] is the headless stand-in.

use crate::game::GameInfo;
use crate::lifecycle::LauncherState;
use crate::nav::Screen;

pub trait DisplaySink {
    /// Switch the visible menu panel.
    fn set_screen(&mut self, screen: Screen);

    /// Highlight a home menu option.
    fn set_home_highlight(&mut self, index: usize);

    /// Replace the visible page of the title list.
    fn set_game_list(&mut self, page: usize, titles: &[String]);

    /// Show one game's detail panel, or the "select a game" placeholder.
    fn set_game_detail(&mut self, info: Option<&GameInfo>);

    /// Update the Start/Play control's enabled state and label.
    fn set_lifecycle_label(&mut self, state: LauncherState);
}

/// Sink that just logs, for headless runs and development.
#[derive(Debug, Default)]
pub struct TracingDisplay;

impl DisplaySink for TracingDisplay {
    fn set_screen(&mut self, screen: Screen) {
        tracing::debug!("display: screen -> {screen:?}");
    }

    fn set_home_highlight(&mut self, index: usize) {
        tracing::debug!("display: home highlight -> {index}");
    }

    fn set_game_list(&mut self, page: usize, titles: &[String]) {
        tracing::debug!("display: page {page} titles -> {titles:?}");
    }

    fn set_game_detail(&mut self, info: Option<&GameInfo>) {
        match info {
            Some(info) => {
                let tags: Vec<String> = info
                    .tags
                    .iter()
                    .map(|t| format!("{} ({})", t.name, t.colour_or_default()))
                    .collect();
                tracing::debug!(
                    "display: detail -> {} v{} by {} [{}]",
                    info.name,
                    info.version,
                    info.authors_line(),
                    tags.join(", ")
                );
            }
            None => tracing::debug!("display: detail -> placeholder"),
        }
    }

    fn set_lifecycle_label(&mut self, state: LauncherState) {
        tracing::debug!("display: start control -> {}", state.label());
    }
}
