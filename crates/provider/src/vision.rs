//! Inline image splicing.
//!
//! Message text may carry `<img src="...">` tags. For vision models the
//! text is split around the tags into text and image blocks; a `data:` URL
//! becomes inline base64 data, anything else an image reference.

use regex::Regex;
use std::sync::LazyLock;
use wcore::{Content, ContentBlock, Vision};

static IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<img\s[^>]*?src\s*=\s*["']([^"']+)["'][^>]*>"#).expect("valid img pattern")
});

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:([\w.+-]+/[\w.+-]+);base64,(.+)$").expect("valid data url pattern")
});

/// Split `text` around inline image tags.
pub fn splice(text: &str) -> Vec<ContentBlock> {
    let mut blocks = Vec::new();
    let mut last = 0;
    for captures in IMG.captures_iter(text) {
        let (Some(tag), Some(src)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_text(&mut blocks, &text[last..tag.start()]);
        blocks.push(image(src.as_str()));
        last = tag.end();
    }
    push_text(&mut blocks, &text[last..]);
    blocks
}

/// The blocks of `content` a model with `vision` support may receive.
///
/// Without vision support images are dropped and tags stay as text.
pub fn expand(content: &Content, vision: Option<Vision>) -> Vec<ContentBlock> {
    let Some(vision) = vision else {
        return content
            .blocks()
            .into_iter()
            .filter(|block| !block.is_image())
            .collect();
    };

    let blocks = match content {
        Content::Text(text) => splice(text),
        Content::Blocks(blocks) => blocks
            .iter()
            .flat_map(|block| match block {
                ContentBlock::Text { text } => splice(text),
                other => vec![other.clone()],
            })
            .collect(),
    };
    blocks
        .into_iter()
        .filter(|block| match block {
            ContentBlock::ImageUrl { .. } if !vision.allow_url => {
                tracing::debug!("dropping image url, model takes inline data only");
                false
            }
            ContentBlock::ImageData { .. } if !vision.allow_base64 => {
                tracing::debug!("dropping inline image, model takes urls only");
                false
            }
            _ => true,
        })
        .collect()
}

/// Render inline image data as a `data:` URL.
pub fn data_url(mime_type: &str, data: &str) -> String {
    format!("data:{mime_type};base64,{data}")
}

fn image(src: &str) -> ContentBlock {
    match DATA_URL.captures(src) {
        Some(captures) => ContentBlock::ImageData {
            mime_type: captures[1].to_owned(),
            data: captures[2].to_owned(),
        },
        None => ContentBlock::ImageUrl {
            url: src.to_owned(),
        },
    }
}

fn push_text(blocks: &mut Vec<ContentBlock>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        blocks.push(ContentBlock::Text {
            text: text.to_owned(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splices_text_around_images() {
        let blocks = splice(
            r#"look <img src="https://x.test/cat.png"> and <img alt="d" src="data:image/png;base64,AAAA"/> ok"#,
        );
        assert_eq!(
            blocks,
            vec![
                ContentBlock::Text {
                    text: "look".into()
                },
                ContentBlock::ImageUrl {
                    url: "https://x.test/cat.png".into()
                },
                ContentBlock::Text { text: "and".into() },
                ContentBlock::ImageData {
                    mime_type: "image/png".into(),
                    data: "AAAA".into()
                },
                ContentBlock::Text { text: "ok".into() },
            ]
        );
    }

    #[test]
    fn capabilities_filter_images() {
        let content = Content::Text(
            r#"a <img src="https://x.test/a.png"> <img src="data:image/jpeg;base64,BB">"#.into(),
        );
        let data_only = expand(
            &content,
            Some(Vision {
                allow_url: false,
                allow_base64: true,
            }),
        );
        assert_eq!(data_only.len(), 2);
        assert!(matches!(data_only[1], ContentBlock::ImageData { .. }));

        let blind = expand(&content, None);
        assert_eq!(blind.len(), 1);
        assert!(!blind[0].is_image());
    }
}
