use anyhow::Result;

#[cfg(feature = "extract")]
use anyhow::Context;
#[cfg(feature = "extract")]
use img_hash::{HashAlg, HasherConfig, image as img_hash_image};
#[cfg(feature = "extract")]
use std::path::Path;

/// Distance reported when either hash is missing or malformed. Larger than
/// any threshold the grouping stage uses.
pub const INCOMPARABLE_DISTANCE: u32 = 999;

/// Resize image to standard dimensions for comparison
/// Uses "Cover" to fill the entire frame, cropping the edges as needed.
/// This focuses on the central content which is most likely to be consistent
/// across story and feed cuts of the same creative
#[cfg(feature = "extract")]
pub fn resize_for_comparison(
    img: &img_hash_image::DynamicImage,
) -> img_hash_image::ImageBuffer<img_hash_image::Rgba<u8>, Vec<u8>> {
    use img_hash_image::GenericImageView;
    let (width, height) = img.dimensions();

    let target_size = 256u32;

    let (crop_width, crop_height) = if width > height {
        (height, height)
    } else {
        (width, width)
    };

    let x = (width - crop_width) / 2;
    let y = (height - crop_height) / 2;

    let cropped = img.crop_imm(x, y, crop_width, crop_height);
    let resized = cropped.resize_exact(
        target_size,
        target_size,
        img_hash_image::imageops::FilterType::Lanczos3,
    );

    resized.to_rgba8()
}

/// Compute the 64-bit average hash of an image file as a hex string, the
/// format `distance` consumes.
#[cfg(feature = "extract")]
pub fn fingerprint_image<P: AsRef<Path>>(image_path: P) -> Result<String> {
    let img = img_hash_image::open(image_path.as_ref())
        .with_context(|| format!("Failed to open image {:?}", image_path.as_ref()))?;

    let resized = resize_for_comparison(&img);
    let dynamic_img = img_hash_image::DynamicImage::ImageRgba8(resized);

    let hasher = HasherConfig::new()
        .hash_alg(HashAlg::Mean)
        .hash_size(8, 8)
        .to_hasher();

    let hash = hasher.hash_image(&dynamic_img);

    Ok(hash.as_bytes().iter().map(|b| format!("{b:02x}")).collect())
}

pub fn hamming_distance(hash1: &[u8], hash2: &[u8]) -> Result<u32> {
    if hash1.len() != hash2.len() {
        anyhow::bail!("Hashes must be the same length");
    }
    let mut distance = 0u32;
    for (byte1, byte2) in hash1.iter().zip(hash2.iter()) {
        let xor = byte1 ^ byte2;

        distance += xor.count_ones();
    }

    Ok(distance)
}

/// Decode a hex hash into one value per nibble.
fn decode_nibbles(hash: &str) -> Option<Vec<u8>> {
    hash.chars()
        .map(|c| c.to_digit(16).map(|d| d as u8))
        .collect()
}

/// Bitwise Hamming distance between two hex-encoded perceptual hashes.
///
/// Total: empty, non-hex or length-mismatched input yields
/// [`INCOMPARABLE_DISTANCE`] instead of an error.
pub fn distance(hash1: &str, hash2: &str) -> u32 {
    if hash1.is_empty() || hash2.is_empty() {
        return INCOMPARABLE_DISTANCE;
    }

    let (Some(a), Some(b)) = (decode_nibbles(hash1), decode_nibbles(hash2)) else {
        tracing::warn!(hash1, hash2, "malformed fingerprint, treating as incomparable");
        return INCOMPARABLE_DISTANCE;
    };

    hamming_distance(&a, &b).unwrap_or(INCOMPARABLE_DISTANCE)
}

pub fn is_similar(hash1: &str, hash2: &str, threshold: u32) -> bool {
    distance(hash1, hash2) <= threshold
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hamming_distance() {
        let hash1 = vec![0b11110000, 0b10101010];
        let hash2 = vec![0b11110000, 0b10101010];
        assert_eq!(hamming_distance(&hash1, &hash2).unwrap(), 0);

        let hash3 = vec![0b11110000, 0b00000000];
        let hash4 = vec![0b00001111, 0b11111111];
        assert_eq!(hamming_distance(&hash3, &hash4).unwrap(), 16);

        assert!(hamming_distance(&[0], &[0, 0]).is_err());
    }

    #[test]
    fn test_distance_hex() {
        assert_eq!(distance("ffff000000000000", "ffff000000000000"), 0);
        assert_eq!(distance("ffff000000000000", "0000000000000000"), 16);
        assert_eq!(distance("0000000000000001", "0000000000000000"), 1);
        assert_eq!(distance("ABCDEF0123456789", "abcdef0123456789"), 0);
    }

    #[test]
    fn test_distance_incomparable() {
        assert_eq!(distance("", "ffff"), INCOMPARABLE_DISTANCE);
        assert_eq!(distance("ffff", ""), INCOMPARABLE_DISTANCE);
        assert_eq!(distance("zzzz", "ffff"), INCOMPARABLE_DISTANCE);
        assert_eq!(distance("fff", "ffff"), INCOMPARABLE_DISTANCE);
    }

    #[test]
    fn test_is_similar() {
        assert!(is_similar("00ff", "00fe", 1));
        assert!(!is_similar("00ff", "00fc", 1));
        assert!(!is_similar("", "", 1000 - 2));
    }

    #[cfg(feature = "extract")]
    #[test]
    fn test_fingerprint_image_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.png");
        let img = img_hash_image::RgbImage::from_fn(108, 192, |x, _| {
            img_hash_image::Rgb([(x * 2) as u8, 40, 90])
        });
        img.save(&path).unwrap();

        let hash = fingerprint_image(&path).unwrap();
        assert_eq!(hash.len(), 16);
        assert_eq!(distance(&hash, &fingerprint_image(&path).unwrap()), 0);

        assert!(fingerprint_image(dir.path().join("missing.png")).is_err());
    }
}
