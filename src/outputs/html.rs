//! Static HTML page for embedding the article on the site.
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating, so
//! the article body is escaped automatically. Blank lines in the body become
//! paragraph breaks and single newlines become `<br>`.

use super::OutputError;
use crate::record::ContentRecord;
use chrono::Local;
use maud::{DOCTYPE, Markup, PreEscaped, html};
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

const UPDATED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const STYLE: &str = r#"
body {
    font-family: 'Arial', sans-serif;
    margin: 0;
    padding: 20px;
    background: white;
    line-height: 1.6;
}
.news-container {
    max-width: 800px;
    margin: 0 auto;
}
.news-image {
    max-width: 100%;
    border-radius: 8px;
    box-shadow: 0 4px 8px rgba(0,0,0,0.1);
    margin: 20px 0;
    transition: transform 0.3s ease;
}
.news-image:hover {
    transform: scale(1.02);
}
.image-placeholder {
    background: #ecf0f1;
    padding: 60px;
    text-align: center;
    border-radius: 8px;
    margin: 20px 0;
    font-size: 18px;
    color: #7f8c8d;
}
.content {
    background: #f8f9fa;
    padding: 25px;
    border-radius: 8px;
    border-left: 4px solid #3498db;
}
.content p {
    margin: 15px 0;
    text-align: justify;
    font-size: 16px;
}
.tags {
    margin-top: 20px;
    color: #3498db;
    font-size: 14px;
}
.footer {
    margin-top: 30px;
    padding-top: 15px;
    border-top: 1px solid #ddd;
    color: #7f8c8d;
    font-size: 14px;
}
"#;

/// Split a body into paragraphs of trimmed lines.
///
/// Any whitespace-only line ends a paragraph. `lines()` also strips the `\r`
/// of CRLF bodies.
fn paragraphs(body: &str) -> Vec<Vec<&str>> {
    let mut paragraphs = Vec::new();
    let mut current = Vec::new();
    for line in body.lines().map(str::trim) {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

fn image_block(record: &ContentRecord) -> Markup {
    html! {
        @if let Some(src) = record.image_reference() {
            img.news-image src=(src) alt="Иллюстрация к статье о нейросетях";
        } @else {
            div.image-placeholder { "🖼️ Изображение появится позже" }
        }
    }
}

/// Render the full HTML document. `updated_at` goes into the footer verbatim.
pub fn render_html(record: &ContentRecord, updated_at: &str) -> String {
    let markup = html! {
        (DOCTYPE)
        html lang="ru" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (record.title()) }
                style { (PreEscaped(STYLE)) }
            }
            body {
                div.news-container {
                    h1.news-title { (record.title()) }
                    (image_block(record))
                    div.content {
                        @for lines in paragraphs(record.body()) {
                            p {
                                @for (i, line) in lines.iter().enumerate() {
                                    @if i > 0 { br; }
                                    (line)
                                }
                            }
                        }
                    }
                    @if !record.tags().is_empty() {
                        div.tags {
                            @for tag in record.tags() {
                                span.tag { "#" (tag) " " }
                            }
                        }
                    }
                    div.footer { "Обновлено: " (updated_at) }
                }
            }
        }
    };
    markup.into_string()
}

/// Render `record` and write it to `path`, replacing any previous page.
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn write_html(record: &ContentRecord, path: &Path) -> Result<(), OutputError> {
    let updated_at = Local::now().format(UPDATED_AT_FORMAT).to_string();
    let page = render_html(record, &updated_at);
    fs::write(path, page).await?;
    info!("Wrote HTML page");
    Ok(())
}
