//! View-state machine
//!
//! Pure state transitions: commands mutate the authoritative view parameters
//! and return the effects the controller must execute. No I/O happens here.

use serde::{Deserialize, Serialize};

use super::zoom::ScaleLimits;
use crate::config::ViewerConfig;
use crate::engine::Rotation;

/// How pages are presented
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViewMode {
    /// One page visible, paginated
    #[default]
    Single,
    /// All pages rendered and scrollable
    Continuous,
}

/// Authoritative view parameters for a document
#[derive(Clone, Debug)]
pub struct ViewerState {
    /// Total page count, 0 until a document is loaded
    pub page_count: usize,

    /// Current page (1-indexed)
    pub current_page: usize,

    /// Scale factor, kept within the configured limits
    pub scale: f32,

    /// Page rotation
    pub rotation: Rotation,

    /// Presentation mode
    pub view_mode: ViewMode,

    limits: ScaleLimits,
    scale_step: f32,
    initial_scale: f32,
}

impl ViewerState {
    #[must_use]
    pub fn new(config: &ViewerConfig) -> Self {
        let limits = ScaleLimits::new(config.min_scale, config.max_scale);
        Self {
            page_count: 0,
            current_page: config.initial_page.max(1),
            scale: limits.clamp(config.initial_scale).unwrap_or(1.0),
            rotation: Rotation::default(),
            view_mode: config.view_mode,
            limits,
            scale_step: config.scale_step,
            initial_scale: config.initial_scale,
        }
    }

    /// Forget the loaded document ahead of a new load.
    pub(crate) fn reset_document(&mut self, initial_page: usize) {
        self.page_count = 0;
        self.current_page = initial_page.max(1);
    }

    /// Apply a command and return the resulting effects
    pub fn apply(&mut self, cmd: Command) -> Result<Vec<Effect>, CommandError> {
        match cmd {
            Command::SetPage(page) => {
                if self.view_mode == ViewMode::Continuous {
                    return Err(CommandError::PaginationInContinuous);
                }
                if self.page_count == 0
                    || page == 0
                    || page > self.page_count
                    || page == self.current_page
                {
                    return Ok(vec![]);
                }
                self.current_page = page;
                Ok(vec![Effect::RetainCurrentPage, Effect::RenderCurrentPage])
            }

            Command::NextPage => {
                if self.view_mode == ViewMode::Continuous {
                    return Err(CommandError::PaginationInContinuous);
                }
                if self.current_page >= self.page_count {
                    return Ok(vec![]);
                }
                self.apply(Command::SetPage(self.current_page + 1))
            }

            Command::PreviousPage => {
                if self.view_mode == ViewMode::Continuous {
                    return Err(CommandError::PaginationInContinuous);
                }
                if self.page_count == 0 || self.current_page <= 1 {
                    return Ok(vec![]);
                }
                self.apply(Command::SetPage(self.current_page - 1))
            }

            Command::SetScale(factor) => {
                let Some(clamped) = self.limits.clamp(factor) else {
                    return Ok(vec![]);
                };
                if (self.scale - clamped).abs() < f32::EPSILON {
                    return Ok(vec![]);
                }
                self.scale = clamped;
                Ok(vec![Effect::InvalidateCache, self.render_visible()])
            }

            Command::ZoomIn => self.apply(Command::SetScale(self.scale * self.scale_step)),

            Command::ZoomOut => self.apply(Command::SetScale(self.scale / self.scale_step)),

            Command::ResetZoom => self.apply(Command::SetScale(self.initial_scale)),

            Command::RotateClockwise => {
                self.rotation = self.rotation.clockwise();
                Ok(vec![Effect::InvalidateCache, self.render_visible()])
            }

            Command::RotateCounterclockwise => {
                self.rotation = self.rotation.counterclockwise();
                Ok(vec![Effect::InvalidateCache, self.render_visible()])
            }

            Command::ToggleViewMode => match self.view_mode {
                ViewMode::Single => {
                    self.view_mode = ViewMode::Continuous;
                    Ok(vec![Effect::RenderAllPages])
                }
                ViewMode::Continuous => {
                    self.view_mode = ViewMode::Single;
                    Ok(vec![Effect::RetainCurrentPage, Effect::RenderCurrentPage])
                }
            },

            Command::Refresh => {
                if self.page_count == 0 {
                    return Ok(vec![]);
                }
                Ok(vec![Effect::InvalidateCache, self.render_visible()])
            }

            Command::SetPageCount(count) => {
                self.page_count = count;
                if count > 0 {
                    self.current_page = self.current_page.clamp(1, count);
                }
                Ok(vec![])
            }
        }
    }

    fn render_visible(&self) -> Effect {
        match self.view_mode {
            ViewMode::Single => Effect::RenderCurrentPage,
            ViewMode::Continuous => Effect::RenderAllPages,
        }
    }
}

/// Commands that modify view state
#[derive(Clone, Copy, Debug)]
pub enum Command {
    /// Go to a specific page (single page mode only)
    SetPage(usize),
    /// Go to the next page, clamped at the last
    NextPage,
    /// Go to the previous page, clamped at the first
    PreviousPage,
    /// Set the scale factor, clamped to the configured limits
    SetScale(f32),
    /// Multiply the scale by the configured step
    ZoomIn,
    /// Divide the scale by the configured step
    ZoomOut,
    /// Restore the configured initial scale
    ResetZoom,
    /// Rotate 90 degrees clockwise
    RotateClockwise,
    /// Rotate 90 degrees counterclockwise
    RotateCounterclockwise,
    /// Switch between single page and continuous mode
    ToggleViewMode,
    /// Drop cached surfaces and re-render the visible pages
    Refresh,
    /// Record the page count of a freshly opened document
    SetPageCount(usize),
}

/// Effects produced by state changes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    /// Cached surfaces no longer match the view parameters
    InvalidateCache,
    /// Keep only the current page's published surface
    RetainCurrentPage,
    /// Render the current page
    RenderCurrentPage,
    /// Render every page of the document
    RenderAllPages,
}

/// Commands rejected by the state machine
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("page navigation is only available in single page mode")]
    PaginationInContinuous,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_state(page_count: usize) -> ViewerState {
        let mut state = ViewerState::new(&ViewerConfig::default());
        state
            .apply(Command::SetPageCount(page_count))
            .expect("set page count");
        state
    }

    #[test]
    fn set_page_renders_new_page() {
        let mut state = test_state(5);

        let effects = state.apply(Command::SetPage(3)).unwrap();
        assert_eq!(state.current_page, 3);
        assert_eq!(
            effects,
            vec![Effect::RetainCurrentPage, Effect::RenderCurrentPage]
        );
    }

    #[test]
    fn set_page_out_of_range_is_noop() {
        let mut state = test_state(5);

        assert!(state.apply(Command::SetPage(0)).unwrap().is_empty());
        assert!(state.apply(Command::SetPage(6)).unwrap().is_empty());
        assert!(state.apply(Command::SetPage(1)).unwrap().is_empty());
        assert_eq!(state.current_page, 1);
    }

    #[test]
    fn pagination_rejected_in_continuous_mode() {
        let mut state = test_state(5);
        state.apply(Command::ToggleViewMode).unwrap();

        assert_eq!(
            state.apply(Command::SetPage(3)),
            Err(CommandError::PaginationInContinuous)
        );
        assert_eq!(
            state.apply(Command::NextPage),
            Err(CommandError::PaginationInContinuous)
        );
        assert_eq!(
            state.apply(Command::PreviousPage),
            Err(CommandError::PaginationInContinuous)
        );
    }

    #[test]
    fn next_and_previous_clamp_at_boundaries() {
        let mut state = test_state(2);

        assert!(state.apply(Command::PreviousPage).unwrap().is_empty());

        state.apply(Command::NextPage).unwrap();
        assert_eq!(state.current_page, 2);
        assert!(state.apply(Command::NextPage).unwrap().is_empty());
        assert_eq!(state.current_page, 2);
    }

    #[test]
    fn set_scale_clamps_to_limits_exactly() {
        let mut state = test_state(5);

        state.apply(Command::SetScale(0.1)).unwrap();
        assert_eq!(state.scale, 0.3);

        state.apply(Command::SetScale(99.0)).unwrap();
        assert_eq!(state.scale, 3.0);
    }

    #[test]
    fn set_scale_same_value_is_noop() {
        let mut state = test_state(5);

        let effects = state.apply(Command::SetScale(1.0)).unwrap();
        assert!(effects.is_empty());
    }

    #[test]
    fn set_scale_non_finite_is_noop() {
        let mut state = test_state(5);

        assert!(state.apply(Command::SetScale(f32::NAN)).unwrap().is_empty());
        assert_eq!(state.scale, 1.0);
    }

    #[test]
    fn scale_change_invalidates_and_rerenders() {
        let mut state = test_state(5);

        let effects = state.apply(Command::SetScale(1.5)).unwrap();
        assert_eq!(
            effects,
            vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
        );

        state.apply(Command::ToggleViewMode).unwrap();
        let effects = state.apply(Command::SetScale(2.0)).unwrap();
        assert_eq!(
            effects,
            vec![Effect::InvalidateCache, Effect::RenderAllPages]
        );
    }

    #[test]
    fn zoom_steps_multiply_and_divide() {
        let mut state = test_state(5);

        state.apply(Command::ZoomIn).unwrap();
        assert_eq!(state.scale, 1.2);

        state.apply(Command::ResetZoom).unwrap();
        assert_eq!(state.scale, 1.0);

        state.apply(Command::ZoomOut).unwrap();
        assert!((state.scale - 1.0 / 1.2).abs() < f32::EPSILON);
    }

    #[test]
    fn four_clockwise_rotations_restore_rotation() {
        let mut state = test_state(5);

        for _ in 0..4 {
            let effects = state.apply(Command::RotateClockwise).unwrap();
            assert_eq!(
                effects,
                vec![Effect::InvalidateCache, Effect::RenderCurrentPage]
            );
        }
        assert_eq!(state.rotation, Rotation::Deg0);
    }

    #[test]
    fn toggle_view_mode_round_trip() {
        let mut state = test_state(5);
        state.apply(Command::SetPage(4)).unwrap();

        let effects = state.apply(Command::ToggleViewMode).unwrap();
        assert_eq!(state.view_mode, ViewMode::Continuous);
        assert_eq!(effects, vec![Effect::RenderAllPages]);

        let effects = state.apply(Command::ToggleViewMode).unwrap();
        assert_eq!(state.view_mode, ViewMode::Single);
        assert_eq!(state.current_page, 4);
        assert_eq!(
            effects,
            vec![Effect::RetainCurrentPage, Effect::RenderCurrentPage]
        );
    }

    #[test]
    fn set_page_count_clamps_current_page() {
        let mut state = ViewerState::new(&ViewerConfig {
            initial_page: 9,
            ..ViewerConfig::default()
        });

        state.apply(Command::SetPageCount(5)).unwrap();
        assert_eq!(state.current_page, 5);
    }

    #[test]
    fn refresh_without_document_is_noop() {
        let mut state = ViewerState::new(&ViewerConfig::default());
        assert!(state.apply(Command::Refresh).unwrap().is_empty());
    }
}
