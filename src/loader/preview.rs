use base64::Engine;
use image::ImageFormat;
use leaf_doctor_common::ImageAsset;
use std::io::Cursor;

/// プレビューの最大辺（px）
pub const PREVIEW_MAX_SIZE: u32 = 256;

/// 表示用プレビュー（PNGに再エンコードしたサムネイル）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePreview {
    pub media_type: &'static str,
    pub width: u32,
    pub height: u32,
    pub data_url: String,
}

impl ImagePreview {
    /// data URLからPNGバイト列を復元
    pub fn png_bytes(&self) -> Option<Vec<u8>> {
        let encoded = self.data_url.split(',').nth(1)?;
        base64::engine::general_purpose::STANDARD.decode(encoded).ok()
    }
}

/// プレビュー生成
///
/// デコード・エンコードに失敗した場合は警告ログのみで None を返す。
pub fn build_preview(asset: &ImageAsset) -> Option<ImagePreview> {
    match try_build_preview(asset) {
        Ok(preview) => Some(preview),
        Err(e) => {
            tracing::warn!(
                fingerprint = asset.fingerprint(),
                media_type = asset.media_type(),
                error = %e,
                "preview generation failed; continuing without preview"
            );
            None
        }
    }
}

fn try_build_preview(asset: &ImageAsset) -> image::ImageResult<ImagePreview> {
    let img = image::load_from_memory(asset.bytes())?;
    // thumbnail は拡大もするため、収まる画像はそのまま使う
    let thumb = if img.width() <= PREVIEW_MAX_SIZE && img.height() <= PREVIEW_MAX_SIZE {
        img
    } else {
        img.thumbnail(PREVIEW_MAX_SIZE, PREVIEW_MAX_SIZE)
    };

    let mut buf = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)?;

    let data = base64::engine::general_purpose::STANDARD.encode(&buf);
    Ok(ImagePreview {
        media_type: "image/png",
        width: thumb.width(),
        height: thumb.height(),
        data_url: format!("data:image/png;base64,{}", data),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaf_doctor_common::validate_image;

    fn png_asset(width: u32, height: u32) -> ImageAsset {
        let img = image::RgbImage::new(width, height);
        let mut buf = Vec::new();
        img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png).unwrap();
        validate_image(buf, "image/png").unwrap()
    }

    #[test]
    fn test_preview_is_downscaled() {
        let preview = build_preview(&png_asset(1024, 512)).unwrap();
        assert_eq!(preview.width, PREVIEW_MAX_SIZE);
        assert_eq!(preview.height, PREVIEW_MAX_SIZE / 2);
    }

    #[test]
    fn test_small_image_not_upscaled() {
        let preview = build_preview(&png_asset(16, 16)).unwrap();
        assert_eq!((preview.width, preview.height), (16, 16));
    }

    #[test]
    fn test_preview_png_bytes_decodable() {
        let preview = build_preview(&png_asset(32, 32)).unwrap();
        let bytes = preview.png_bytes().unwrap();
        assert_eq!(image::guess_format(&bytes).unwrap(), ImageFormat::Png);
    }

    #[test]
    fn test_preview_failure_is_none() {
        let asset = validate_image(b"garbage".to_vec(), "image/jpeg").unwrap();
        assert!(build_preview(&asset).is_none());
    }
}
