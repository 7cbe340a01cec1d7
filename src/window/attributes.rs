/// Per-session window configuration, fixed before `Window::create` and read
/// by both the render thread and the window-owning thread afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowAttributes {
    /// Create a secondary (slave) window for the second eye or control codes.
    pub has_slave: bool,
    /// Strip the decoration frame from the master window.
    pub no_decor: bool,
    /// Keep the windows hidden after creation.
    pub hide_on_start: bool,
    /// Capture media keys globally, outside of input focus.
    pub global_media_keys: bool,
    /// Suppress screensaver and monitor power-save while the window lives.
    pub block_sleep_display: bool,
    /// Keep the slave window hidden (it still exists for control codes).
    pub slave_hidden: bool,
    /// Collapse the slave window to a thin strip along the monitor top edge.
    pub slave_top_line: bool,
}

impl Default for WindowAttributes {
    fn default() -> Self {
        Self {
            has_slave: false,
            no_decor: false,
            hide_on_start: false,
            global_media_keys: false,
            block_sleep_display: false,
            slave_hidden: false,
            slave_top_line: false,
        }
    }
}

impl WindowAttributes {
    /// True when the slave window has its own placement rather than sharing
    /// or tiling with the master.
    pub fn is_slave_independent(&self) -> bool {
        self.has_slave && !self.slave_top_line
    }
}
