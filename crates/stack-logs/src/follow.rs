//! Follow-mode controller.
//!
//! Tracks whether the viewport is pinned to the newest entry. Units are
//! whatever the renderer scrolls in (pixels, rows); only their differences
//! matter.

use crate::config::DEFAULT_FOLLOW_THRESHOLD;

/// Scroll position and follow state of the log viewport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowController {
    following: bool,
    threshold: usize,
    offset: usize,
    viewport: usize,
    content: usize,
}

impl Default for FollowController {
    fn default() -> Self {
        Self::new(DEFAULT_FOLLOW_THRESHOLD)
    }
}

impl FollowController {
    /// Creates a controller that starts following.
    #[must_use]
    pub const fn new(threshold: usize) -> Self {
        Self {
            following: true,
            threshold,
            offset: 0,
            viewport: 0,
            content: 0,
        }
    }

    /// Whether the view auto-scrolls to new entries.
    #[must_use]
    pub const fn is_following(&self) -> bool {
        self.following
    }

    /// Current scroll offset from the top of the content.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Height of the visible area.
    #[must_use]
    pub const fn viewport(&self) -> usize {
        self.viewport
    }

    /// Height of the whole content.
    #[must_use]
    pub const fn content(&self) -> usize {
        self.content
    }

    /// Largest valid offset.
    #[must_use]
    pub const fn max_offset(&self) -> usize {
        self.content.saturating_sub(self.viewport)
    }

    /// Distance from the current position to the bottom of the content.
    #[must_use]
    pub const fn distance_from_bottom(&self) -> usize {
        self.content.saturating_sub(self.offset + self.viewport)
    }

    /// Records a new viewport height; follows the bottom if pinned.
    pub fn set_viewport(&mut self, viewport: usize) {
        self.viewport = viewport;
        self.settle();
    }

    /// Records a new content height after a buffer update.
    ///
    /// Returns true if the view was scrolled to the newest entry.
    pub fn on_content_changed(&mut self, content: usize) -> bool {
        self.content = content;
        self.settle()
    }

    /// Handles a manual scroll to `offset`.
    ///
    /// Following is re-derived from the distance to the bottom on every event.
    pub fn on_scroll(&mut self, offset: usize) {
        self.offset = offset.min(self.max_offset());
        self.following = self.distance_from_bottom() <= self.threshold;
    }

    /// Scrolls by a signed delta, as a wheel or arrow key would.
    pub fn scroll_by(&mut self, delta: isize) {
        self.on_scroll(self.offset.saturating_add_signed(delta));
    }

    /// Flips follow mode regardless of the scroll position.
    pub fn toggle(&mut self) -> bool {
        self.set_following(!self.following);
        self.following
    }

    /// Sets follow mode explicitly. Enabling it snaps to the bottom.
    pub fn set_following(&mut self, following: bool) {
        self.following = following;
        self.settle();
    }

    /// Scrolls to the newest entry without changing follow mode.
    pub fn jump_to_newest(&mut self) {
        self.offset = self.max_offset();
    }

    fn settle(&mut self) -> bool {
        if self.following {
            self.offset = self.max_offset();
            true
        } else {
            self.offset = self.offset.min(self.max_offset());
            false
        }
    }
}
