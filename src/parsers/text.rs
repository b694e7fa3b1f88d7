/// Options for normalizing extracted text
#[derive(Debug, Clone, Copy, Default)]
pub struct TextOptions {
    /// Keep paragraph boundaries as exactly one empty line
    pub preserve_paragraphs: bool,
}

/// Normalizes text: trims lines, drops empty paragraphs and collapses whitespace
pub fn normalize(text: &str, options: &TextOptions) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let paragraphs: Vec<String> = split_into_paragraphs(text)
        .iter()
        .map(|para| normalize_segment(&para.join(" ")))
        .filter(|para| !para.is_empty())
        .collect();

    if options.preserve_paragraphs {
        paragraphs.join("\n\n")
    } else {
        paragraphs.join(" ")
    }
}

/// Splits text into paragraphs based on empty lines
pub fn split_into_paragraphs(text: &str) -> Vec<Vec<&str>> {
    let mut paragraphs: Vec<Vec<&str>> = Vec::new();
    let mut current_paragraph: Vec<&str> = Vec::new();

    for line in text.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() {
            // Found an empty line, which marks a paragraph boundary
            if !current_paragraph.is_empty() {
                paragraphs.push(current_paragraph);
                current_paragraph = Vec::new();
            }
        } else {
            current_paragraph.push(trimmed);
        }
    }

    if !current_paragraph.is_empty() {
        paragraphs.push(current_paragraph);
    }

    paragraphs
}

/// Collapses runs of whitespace into single spaces
pub fn normalize_segment(segment: &str) -> String {
    segment.split_whitespace().collect::<Vec<_>>().join(" ")
}
