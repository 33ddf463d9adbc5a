use std::io::Write;
use std::path::{Path, PathBuf};

use genai_core::WrapErr;
use genai_llm::{GenerateOptions, Message};

use crate::provision::{model_client, Cleanup, CliResult, Connection, VISION_MODEL};

pub const VISION_PROMPT: &str = "Please tell me what you see in this image";

/// Image handed to the model
#[derive(Debug, Clone)]
pub enum ImageSource {
    File(PathBuf),
    Url(String),
}

/// Mime type guessed from the file extension, jpeg when unknown
pub fn image_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "image/jpeg",
    }
}

pub async fn run(connection: &Connection, image: ImageSource) -> CliResult<()> {
    let mut cleanup = Cleanup::new(connection.keep_containers);
    let result = vision(connection, image, &mut cleanup).await;
    cleanup.finish(result).await
}

async fn vision(connection: &Connection, image: ImageSource, cleanup: &mut Cleanup) -> CliResult<()> {
    let client = model_client(connection, VISION_MODEL, cleanup).await?;

    let message = Message::human(VISION_PROMPT);
    let message = match image {
        ImageSource::File(path) => {
            let data = tokio::fs::read(&path)
                .await
                .wrap(&format!("read image {}", path.display()))?;
            message.with_binary(image_mime(&path), data)
        }
        // ollama only accepts inline images
        ImageSource::Url(url) if client.provider_name() == "ollama" => {
            let response = reqwest::get(&url)
                .await
                .and_then(|r| r.error_for_status())
                .wrap(&format!("download image {}", url))?;
            let data = response.bytes().await.wrap(&format!("download image {}", url))?;
            message.with_binary(image_mime(Path::new(&url)), data.to_vec())
        }
        ImageSource::Url(url) => message.with_image_url(url),
    };

    let mut stdout = std::io::stdout();
    client
        .generate_streaming(vec![message], &GenerateOptions::default(), |chunk| {
            write!(stdout, "{}", chunk.content)?;
            stdout.flush()?;
            Ok(())
        })
        .await
        .wrap("llm generate content")?;
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_mime() {
        assert_eq!(image_mime(Path::new("cat.png")), "image/png");
        assert_eq!(image_mime(Path::new("cat.PNG")), "image/png");
        assert_eq!(image_mime(Path::new("images/cat.jpg")), "image/jpeg");
        assert_eq!(image_mime(Path::new("cat")), "image/jpeg");
    }
}
