//! 画像ファイル読み込み
//!
//! ファイルを読み、メディアタイプを判定する。検証はパイプライン側で行う。

mod preview;

pub use preview::{build_preview, ImagePreview, PREVIEW_MAX_SIZE};

use crate::error::{DiagnosisError, Result};
use image::ImageFormat;
use leaf_doctor_common::validate::check_constraints;
use std::path::Path;

/// 判定できない場合のメディアタイプ
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

/// 検証前の画像
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub media_type: String,
}

/// 画像ファイルを読み込む（検証はしない）
pub async fn read_candidate(path: &Path) -> Result<ImageCandidate> {
    if !path.is_file() {
        return Err(DiagnosisError::ImageLoad(format!(
            "ファイルが見つかりません: {}",
            path.display()
        )));
    }

    // 読み込む前に宣言サイズで上限を確認
    let declared_size = tokio::fs::metadata(path).await?.len();
    if declared_size > leaf_doctor_common::MAX_IMAGE_BYTES {
        check_constraints(declared_size, &media_type_from_extension(path))?;
    }

    let bytes = tokio::fs::read(path).await?;
    let media_type = detect_media_type(&bytes, path);
    tracing::debug!(path = %path.display(), size = bytes.len(), %media_type, "image read");

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    Ok(ImageCandidate {
        file_name,
        bytes,
        media_type,
    })
}

/// メディアタイプ判定（内容 → 拡張子 → 不明）
pub fn detect_media_type(bytes: &[u8], path: &Path) -> String {
    match image::guess_format(bytes) {
        Ok(format) => format.to_mime_type().to_string(),
        Err(_) => media_type_from_extension(path),
    }
}

fn media_type_from_extension(path: &Path) -> String {
    path.extension()
        .and_then(ImageFormat::from_extension)
        .map(|format| format.to_mime_type().to_string())
        .unwrap_or_else(|| UNKNOWN_MEDIA_TYPE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaf_doctor_common::{validate_image, ValidationError};
    use tempfile::tempdir;

    fn write_png(path: &Path) {
        image::RgbImage::from_pixel(8, 8, image::Rgb([40, 160, 60]))
            .save(path)
            .unwrap();
    }

    #[test]
    fn test_detect_media_type_from_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leaf.bin");
        write_png(&dir.path().join("leaf.png"));
        let bytes = std::fs::read(dir.path().join("leaf.png")).unwrap();
        // 拡張子より内容を優先
        assert_eq!(detect_media_type(&bytes, &path), "image/png");
    }

    #[test]
    fn test_detect_media_type_from_extension() {
        assert_eq!(detect_media_type(b"garbage", Path::new("a.JPG")), "image/jpeg");
        assert_eq!(detect_media_type(b"garbage", Path::new("a.webp")), "image/webp");
        assert_eq!(detect_media_type(b"garbage", Path::new("a.txt")), UNKNOWN_MEDIA_TYPE);
        assert_eq!(detect_media_type(b"garbage", Path::new("noext")), UNKNOWN_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_load_png_with_preview() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("leaf.png");
        write_png(&path);

        let candidate = read_candidate(&path).await.unwrap();
        assert_eq!(candidate.file_name, "leaf.png");
        let asset = validate_image(candidate.bytes, &candidate.media_type).unwrap();
        assert_eq!(asset.media_type(), "image/png");
        let preview = build_preview(&asset).expect("プレビューが生成されていない");
        assert!(preview.data_url.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_undecodable_image_loads_without_preview() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not really a jpeg").unwrap();

        let candidate = read_candidate(&path).await.unwrap();
        let asset = validate_image(candidate.bytes, &candidate.media_type).unwrap();
        assert_eq!(asset.media_type(), "image/jpeg");
        assert!(build_preview(&asset).is_none());
    }

    #[tokio::test]
    async fn test_text_file_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        let candidate = read_candidate(&path).await.unwrap();
        let err = validate_image(candidate.bytes, &candidate.media_type).unwrap_err();
        assert!(matches!(err, ValidationError::UnsupportedType(_)));
    }

    #[tokio::test]
    async fn test_read_candidate_keeps_raw_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("notes.txt");
        std::fs::write(&path, b"hello").unwrap();

        // 検証前なので読み込み自体は成功する
        let candidate = read_candidate(&path).await.unwrap();
        assert_eq!(candidate.file_name, "notes.txt");
        assert_eq!(candidate.bytes, b"hello");
        assert_eq!(candidate.media_type, UNKNOWN_MEDIA_TYPE);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let err = read_candidate(Path::new("/nonexistent/leaf.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, DiagnosisError::ImageLoad(_)));
    }
}
