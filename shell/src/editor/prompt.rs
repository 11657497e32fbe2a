/// An already rendered prompt and the number of columns it occupies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptText {
    text: String,
    visible_len: usize,
}

impl PromptText {
    /// Wraps `text`, measuring it with every escape sequence (CSI colors,
    /// OSC titles, charset selection) stripped out.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let visible_len = strip_ansi_escapes::strip_str(&text).chars().count();
        Self { text, visible_len }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn visible_len(&self) -> usize {
        self.visible_len
    }
}
