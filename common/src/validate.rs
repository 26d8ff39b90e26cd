//! 画像検証
//!
//! サイズ上限（10MiB）→ メディアタイプ（image/*）の順に検査する。

use crate::error::ValidationError;
use crate::types::ImageAsset;

/// 画像サイズ上限（バイト）
pub const MAX_IMAGE_BYTES: u64 = 10 * 1024 * 1024;

/// 宣言サイズとメディアタイプのみで検査
///
/// サイズ超過はメディアタイプに関わらず `TooLarge`。
pub fn check_constraints(size: u64, media_type: &str) -> Result<(), ValidationError> {
    if size > MAX_IMAGE_BYTES {
        return Err(ValidationError::TooLarge { size });
    }

    if !is_image_media_type(media_type) {
        return Err(ValidationError::UnsupportedType(media_type.to_string()));
    }

    Ok(())
}

/// 画像データを検証して `ImageAsset` を生成
pub fn validate_image(bytes: Vec<u8>, media_type: &str) -> Result<ImageAsset, ValidationError> {
    check_constraints(bytes.len() as u64, media_type)?;
    Ok(ImageAsset::new(bytes, media_type.trim().to_lowercase()))
}

fn is_image_media_type(media_type: &str) -> bool {
    let media_type = media_type.trim().to_lowercase();
    media_type
        .strip_prefix("image/")
        .map(|subtype| !subtype.is_empty())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_small_image() {
        assert!(check_constraints(1024, "image/jpeg").is_ok());
        assert!(check_constraints(MAX_IMAGE_BYTES, "image/png").is_ok());
    }

    #[test]
    fn test_too_large_regardless_of_type() {
        for media_type in ["image/jpeg", "image/webp", "text/plain", "application/pdf", ""] {
            let err = check_constraints(MAX_IMAGE_BYTES + 1, media_type).unwrap_err();
            assert_eq!(err, ValidationError::TooLarge { size: MAX_IMAGE_BYTES + 1 });
        }
    }

    #[test]
    fn test_non_image_type_rejected_even_if_small() {
        for media_type in [
            "text/plain",
            "application/octet-stream",
            "video/mp4",
            "image/",
            "imagex/png",
        ] {
            let err = check_constraints(10, media_type).unwrap_err();
            assert!(
                matches!(err, ValidationError::UnsupportedType(_)),
                "{} should be rejected",
                media_type
            );
        }
    }

    #[test]
    fn test_media_type_case_insensitive() {
        assert!(check_constraints(10, "IMAGE/PNG").is_ok());
    }

    #[test]
    fn test_validate_image_builds_asset() {
        let asset = validate_image(vec![1, 2, 3], "Image/JPEG").unwrap();
        assert_eq!(asset.media_type(), "image/jpeg");
        assert_eq!(asset.size(), 3);
        assert_eq!(asset.bytes(), &[1, 2, 3]);
    }

    #[test]
    fn test_validate_image_too_large() {
        let bytes = vec![0u8; (MAX_IMAGE_BYTES + 1) as usize];
        let err = validate_image(bytes, "image/png").unwrap_err();
        assert!(matches!(err, ValidationError::TooLarge { .. }));
    }
}
