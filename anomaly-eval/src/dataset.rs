//! Dataset discovery and loading for the anomaly benchmarks.
//!
//! Benchmarks store images under an `images` directory and ground truth under
//! a sibling `labels_masks` directory with the same file stem. Some datasets
//! keep masks in a different file format than their images.

use std::{
    fs::File,
    io::BufReader,
    path::{Component, Path, PathBuf},
};

use burn::tensor::{backend::Backend, Tensor, TensorData};
use image::{imageops::FilterType, DynamicImage, GenericImageView, GrayImage};
use walkdir::WalkDir;

use crate::{
    error::{AnomalyEvalError, AnomalyEvalResult},
    maps::RawMask,
};

/// Directory holding the input images.
const IMAGE_DIR: &str = "images";
/// Directory holding the ground-truth masks.
const MASK_DIR: &str = "labels_masks";

/// `(dataset name, image extension, mask extension)` for datasets whose masks
/// use a different file format than their images.
const MASK_EXTENSION_FIXES: &[(&str, &str, &str)] = &[
    ("RoadObsticle21", "webp", "png"),
    ("fs_static", "jpg", "png"),
    ("RoadAnomaly", "jpg", "png"),
];

/// A decoded image with its raw ground truth, both at the target size.
#[derive(Debug, Clone)]
pub struct AnomalySample<B: Backend> {
    /// RGB image tensor with shape `[3, H, W]` and values in `[0, 1]`.
    pub image: Tensor<B, 3>,
    /// Ground truth in the dataset's own encoding.
    pub mask: RawMask,
    /// Source image path.
    pub path: PathBuf,
}

/// Image/mask pairs of one benchmark.
#[derive(Debug, Clone)]
pub struct AnomalyDataset {
    items: Vec<(PathBuf, PathBuf)>,
    target_size: [usize; 2],
}

impl AnomalyDataset {
    /// Discovers every image matching `pattern` and resolves its mask.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::DatasetError`] if no image matches and
    /// [`AnomalyEvalError::MissingGroundTruth`] if a mask does not exist.
    pub fn discover(pattern: &str, target_size: [usize; 2]) -> AnomalyEvalResult<Self> {
        let images = discover_images(pattern)?;
        let items = images
            .into_iter()
            .map(|image| {
                let mask = resolve_mask_path(&image);
                if mask.is_file() {
                    Ok((image, mask))
                } else {
                    Err(AnomalyEvalError::MissingGroundTruth { path: mask })
                }
            })
            .collect::<AnomalyEvalResult<Vec<_>>>()?;

        tracing::info!(count = items.len(), pattern, "found image/mask pairs");
        Ok(Self { items, target_size })
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Image and mask paths in processing order.
    pub fn items(&self) -> &[(PathBuf, PathBuf)] {
        &self.items
    }

    /// Loads the pair at `index`, resized to the target size.
    ///
    /// # Errors
    ///
    /// Returns [`AnomalyEvalError::DatasetError`] for an out-of-range index and
    /// [`AnomalyEvalError::ImageLoad`] if a file cannot be decoded.
    pub fn load<B: Backend>(
        &self,
        index: usize,
        device: &B::Device,
    ) -> AnomalyEvalResult<AnomalySample<B>> {
        let (image_path, mask_path) =
            self.items
                .get(index)
                .ok_or_else(|| AnomalyEvalError::DatasetError {
                    message: format!("index {index} out of range for {} items", self.len()),
                })?;

        Ok(AnomalySample {
            image: load_image(image_path, self.target_size, device)?,
            mask: load_raw_mask(mask_path, self.target_size)?,
            path: image_path.clone(),
        })
    }
}

/// Derives the ground-truth path of an image.
///
/// The `images` directory becomes `labels_masks`, and the extension is
/// corrected for datasets that store masks as PNG.
pub fn resolve_mask_path(image_path: &Path) -> PathBuf {
    let mut mask_path: PathBuf = image_path
        .components()
        .map(|component| match component {
            Component::Normal(name) if name == IMAGE_DIR => Component::Normal(MASK_DIR.as_ref()),
            other => other,
        })
        .collect();

    let path_str = mask_path.to_string_lossy().into_owned();
    for (dataset, from, to) in MASK_EXTENSION_FIXES {
        let matches_extension = mask_path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(from));
        if path_str.contains(dataset) && matches_extension {
            mask_path.set_extension(to);
        }
    }
    mask_path
}

/// Lists the files matching a glob-style pattern, sorted.
///
/// Supports `*` and `?` within a path component, `**` for any number of
/// directories and a leading `~` for the home directory.
///
/// # Errors
///
/// Returns [`AnomalyEvalError::DatasetError`] if nothing matches.
pub fn discover_images(pattern: &str) -> AnomalyEvalResult<Vec<PathBuf>> {
    let pattern = expand_home(pattern);
    let components: Vec<&str> = pattern.split('/').collect();
    let first_wildcard = components
        .iter()
        .position(|c| c.contains(['*', '?']));

    let mut paths = match first_wildcard {
        None => {
            let path = PathBuf::from(&pattern);
            if path.is_file() {
                vec![path]
            } else {
                Vec::new()
            }
        }
        Some(split) => {
            let base = match components[..split].join("/") {
                base if base.is_empty() && pattern.starts_with('/') => "/".to_owned(),
                base if base.is_empty() => ".".to_owned(),
                base => base,
            };
            let rest = &components[split..];

            let mut walker = WalkDir::new(&base).min_depth(1).follow_links(true);
            if !rest.contains(&"**") {
                walker = walker.max_depth(rest.len());
            }

            walker
                .into_iter()
                .filter_map(Result::ok)
                .filter(|entry| entry.file_type().is_file())
                .filter(|entry| {
                    entry.path().strip_prefix(&base).is_ok_and(|relative| {
                        let parts: Vec<&str> = relative
                            .components()
                            .filter_map(|c| c.as_os_str().to_str())
                            .collect();
                        match_components(rest, &parts)
                    })
                })
                .map(walkdir::DirEntry::into_path)
                .collect()
        }
    };

    if paths.is_empty() {
        return Err(AnomalyEvalError::DatasetError {
            message: format!("No images match pattern: {pattern}"),
        });
    }
    paths.sort();
    Ok(paths)
}

fn expand_home(pattern: &str) -> String {
    match (pattern.strip_prefix('~'), dirs::home_dir()) {
        (Some(rest), Some(home)) if rest.is_empty() || rest.starts_with('/') => {
            format!("{}{rest}", home.display())
        }
        _ => pattern.to_owned(),
    }
}

/// Matches path components against pattern components, `**` spanning any depth.
///
/// Hidden components only match a pattern component that itself starts with
/// a dot, so wildcards never pick up dot-files such as `._a.png` sidecars.
fn match_components(patterns: &[&str], parts: &[&str]) -> bool {
    match (patterns.first(), parts.first()) {
        (None, None) => true,
        (Some(&"**"), _) => {
            match_components(&patterns[1..], parts)
                || parts.first().is_some_and(|part| {
                    !part.starts_with('.') && match_components(patterns, &parts[1..])
                })
        }
        (Some(pattern), Some(part)) => {
            (pattern.starts_with('.') || !part.starts_with('.'))
                && wildcard_match(pattern.as_bytes(), part.as_bytes())
                && match_components(&patterns[1..], &parts[1..])
        }
        _ => false,
    }
}

/// Matches a single component with `*` and `?` wildcards.
fn wildcard_match(pattern: &[u8], text: &[u8]) -> bool {
    match (pattern.first(), text.first()) {
        (None, None) => true,
        (Some(b'*'), _) => {
            wildcard_match(&pattern[1..], text)
                || (!text.is_empty() && wildcard_match(pattern, &text[1..]))
        }
        (Some(b'?'), Some(_)) => wildcard_match(&pattern[1..], &text[1..]),
        (Some(p), Some(t)) if p == t => wildcard_match(&pattern[1..], &text[1..]),
        _ => false,
    }
}

fn load_error(path: &Path, reason: impl ToString) -> AnomalyEvalError {
    AnomalyEvalError::ImageLoad {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    }
}

fn open(path: &Path) -> AnomalyEvalResult<DynamicImage> {
    image::open(path).map_err(|e| load_error(path, e))
}

/// Reads the palette indices of an indexed PNG.
///
/// Returns `None` for any other colour type. The `image` decoder expands
/// palettes to RGB, which would turn label indices into colours.
fn read_palette_indices(path: &Path) -> AnomalyEvalResult<Option<GrayImage>> {
    let file = File::open(path).map_err(|e| load_error(path, e))?;
    let mut decoder = png::Decoder::new(BufReader::new(file));
    decoder.set_transformations(png::Transformations::IDENTITY);
    let mut reader = decoder.read_info().map_err(|e| load_error(path, e))?;
    if reader.info().color_type != png::ColorType::Indexed {
        return Ok(None);
    }

    let mut buf = vec![0; reader.output_buffer_size()];
    let frame = reader.next_frame(&mut buf).map_err(|e| load_error(path, e))?;
    let (width, height) = (frame.width as usize, frame.height as usize);
    let bits = frame.bit_depth as usize;
    let per_byte = 8 / bits;
    let index_mask = ((1u16 << bits) - 1) as u8;

    let mut indices = Vec::with_capacity(width * height);
    for row in buf.chunks(frame.line_size).take(height) {
        if bits == 8 {
            indices.extend_from_slice(&row[..width]);
            continue;
        }
        // Sub-byte depths are packed most significant bits first.
        indices.extend((0..width).map(|x| {
            let shift = 8 - bits * (x % per_byte + 1);
            (row[x / per_byte] >> shift) & index_mask
        }));
    }

    GrayImage::from_raw(frame.width, frame.height, indices)
        .map(Some)
        .ok_or_else(|| load_error(path, "palette indices do not fill the image"))
}

fn resize(image: DynamicImage, [height, width]: [usize; 2], filter: FilterType) -> DynamicImage {
    let (w, h) = image.dimensions();
    if w as usize == width && h as usize == height {
        image
    } else {
        image.resize_exact(width as u32, height as u32, filter)
    }
}

/// Loads an RGB image resized with bilinear filtering to `[3, H, W]` in `[0, 1]`.
///
/// # Errors
///
/// Returns [`AnomalyEvalError::ImageLoad`] if the file cannot be decoded.
pub fn load_image<B: Backend>(
    path: &Path,
    target_size: [usize; 2],
    device: &B::Device,
) -> AnomalyEvalResult<Tensor<B, 3>> {
    let image = resize(open(path)?, target_size, FilterType::Triangle).into_rgb32f();
    let (width, height) = image.dimensions();

    let data = TensorData::new(image.into_raw(), [height as usize, width as usize, 3])
        .convert::<B::FloatElem>();
    // HWC to CHW
    Ok(Tensor::<B, 3>::from_data(data, device).permute([2, 0, 1]))
}

/// Loads a label mask resized with nearest-neighbour sampling so no new
/// label values are introduced.
///
/// Indexed PNGs yield their palette indices; other masks are read as 8-bit
/// luma.
///
/// # Errors
///
/// Returns [`AnomalyEvalError::ImageLoad`] if the file cannot be decoded.
pub fn load_raw_mask(path: &Path, target_size: [usize; 2]) -> AnomalyEvalResult<RawMask> {
    let is_png = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"));
    let indexed = if is_png {
        read_palette_indices(path)?
    } else {
        None
    };
    let mask = match indexed {
        Some(indices) => DynamicImage::ImageLuma8(indices),
        None => open(path)?,
    };

    let mask = resize(mask, target_size, FilterType::Nearest).into_luma8();
    let (width, height) = mask.dimensions();
    RawMask::new(mask.into_raw(), height as usize, width as usize)
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use burn::backend::ndarray::NdArray;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    type TestBackend = NdArray<f32>;

    fn write_pair(root: &Path, stem: &str, labels: [u8; 4]) {
        fs::create_dir_all(root.join("images")).unwrap();
        fs::create_dir_all(root.join("labels_masks")).unwrap();

        RgbImage::from_pixel(4, 2, Rgb([255, 0, 0]))
            .save(root.join("images").join(format!("{stem}.png")))
            .unwrap();

        let mut mask = GrayImage::new(2, 2);
        for (pixel, label) in mask.pixels_mut().zip(labels) {
            *pixel = Luma([label]);
        }
        mask.save(root.join("labels_masks").join(format!("{stem}.png")))
            .unwrap();
    }

    fn write_indexed_png(path: &Path, width: u32, height: u32, depth: png::BitDepth, data: &[u8]) {
        let file = std::io::BufWriter::new(fs::File::create(path).unwrap());
        let mut encoder = png::Encoder::new(file, width, height);
        encoder.set_color(png::ColorType::Indexed);
        encoder.set_depth(depth);
        encoder.set_palette(vec![0, 0, 0, 10, 10, 10, 200, 50, 50, 0, 0, 255]);
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }

    #[test]
    fn mask_path_swaps_directory_and_fixes_extensions() {
        assert_eq!(
            resolve_mask_path(Path::new("/data/RoadObsticle21/images/a.webp")),
            PathBuf::from("/data/RoadObsticle21/labels_masks/a.png")
        );
        assert_eq!(
            resolve_mask_path(Path::new("/data/fs_static/images/b.jpg")),
            PathBuf::from("/data/fs_static/labels_masks/b.png")
        );
        assert_eq!(
            resolve_mask_path(Path::new("/data/RoadAnomaly/images/c.jpg")),
            PathBuf::from("/data/RoadAnomaly/labels_masks/c.png")
        );
        assert_eq!(
            resolve_mask_path(Path::new("/data/FS_LostAndFound_full/images/d.png")),
            PathBuf::from("/data/FS_LostAndFound_full/labels_masks/d.png")
        );
    }

    #[test]
    fn mask_path_keeps_file_names_containing_images() {
        assert_eq!(
            resolve_mask_path(Path::new("/data/set/images/images_01.png")),
            PathBuf::from("/data/set/labels_masks/images_01.png")
        );
    }

    #[test]
    fn wildcards_match_single_components() {
        assert!(wildcard_match(b"*.png", b"frame_01.png"));
        assert!(wildcard_match(b"frame_??.png", b"frame_01.png"));
        assert!(!wildcard_match(b"*.png", b"frame_01.jpg"));
        assert!(!wildcard_match(b"frame_?.png", b"frame_01.png"));
        assert!(match_components(&["**", "*.png"], &["a", "b", "c.png"]));
        assert!(match_components(&["**", "*.png"], &["c.png"]));
        assert!(!match_components(&["*", "*.png"], &["c.png"]));
    }

    #[test]
    fn wildcards_skip_hidden_components() {
        assert!(!match_components(&["*.png"], &["._a.png"]));
        assert!(!match_components(&["?a.png"], &[".a.png"]));
        assert!(!match_components(&["**", "*.png"], &[".cache", "a.png"]));
        assert!(match_components(&[".*.png"], &["._a.png"]));
        assert!(match_components(&["*.png"], &["a.png"]));
    }

    #[test]
    fn discover_ignores_dot_file_sidecars() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "a", [0, 0, 1, 1]);
        fs::write(dir.path().join("images").join("._a.png"), b"resource fork").unwrap();

        let pattern = format!("{}/images/*.png", dir.path().display());
        let dataset = AnomalyDataset::discover(&pattern, [2, 2]).unwrap();

        assert_eq!(dataset.len(), 1);
        assert!(dataset.items()[0].0.ends_with("images/a.png"));
    }

    #[test]
    fn indexed_mask_yields_palette_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        write_indexed_png(&path, 2, 1, png::BitDepth::Eight, &[0, 2]);

        let mask = load_raw_mask(&path, [1, 2]).unwrap();
        assert_eq!(mask.labels(), &[0, 2]);

        let upscaled = load_raw_mask(&path, [2, 4]).unwrap();
        assert!(upscaled.labels().iter().all(|v| *v == 0 || *v == 2));
        assert!(upscaled.labels().contains(&2));
    }

    #[test]
    fn packed_indexed_mask_is_unpacked() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mask.png");
        // Indices 1, 2, 3 at four bits per pixel.
        write_indexed_png(&path, 3, 1, png::BitDepth::Four, &[0x12, 0x30]);

        let mask = load_raw_mask(&path, [1, 3]).unwrap();
        assert_eq!(mask.labels(), &[1, 2, 3]);
    }

    #[test]
    fn discover_finds_sorted_pairs() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "b", [0, 0, 1, 1]);
        write_pair(dir.path(), "a", [0, 0, 0, 0]);

        let pattern = format!("{}/images/*.png", dir.path().display());
        let dataset = AnomalyDataset::discover(&pattern, [2, 2]).unwrap();

        assert_eq!(dataset.len(), 2);
        assert!(dataset.items()[0].0.ends_with("images/a.png"));
        assert!(dataset.items()[0].1.ends_with("labels_masks/a.png"));
        assert!(dataset.items()[1].0.ends_with("images/b.png"));
    }

    #[test]
    fn missing_mask_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "a", [0, 0, 1, 1]);
        fs::remove_file(dir.path().join("labels_masks").join("a.png")).unwrap();

        let pattern = format!("{}/images/*.png", dir.path().display());
        match AnomalyDataset::discover(&pattern, [2, 2]) {
            Err(AnomalyEvalError::MissingGroundTruth { path }) => {
                assert!(path.ends_with("labels_masks/a.png"));
            }
            other => panic!("Expected MissingGroundTruth error, got {other:?}"),
        }
    }

    #[test]
    fn pattern_without_matches_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let pattern = format!("{}/images/*.png", dir.path().display());
        assert!(matches!(
            discover_images(&pattern),
            Err(AnomalyEvalError::DatasetError { .. })
        ));
    }

    #[test]
    fn load_resizes_image_and_keeps_mask_labels() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "a", [0, 2, 2, 0]);

        let pattern = format!("{}/images/*.png", dir.path().display());
        let dataset = AnomalyDataset::discover(&pattern, [4, 4]).unwrap();
        let sample = dataset.load::<TestBackend>(0, &Default::default()).unwrap();

        assert_eq!(sample.image.dims(), [3, 4, 4]);
        let red = sample
            .image
            .slice([0..1, 0..4, 0..4])
            .into_data()
            .to_vec::<f32>()
            .unwrap();
        assert!(red.iter().all(|v| (v - 1.0).abs() < 1e-5));

        assert_eq!(sample.mask.dims(), [4, 4]);
        assert!(sample.mask.labels().iter().all(|v| *v == 0 || *v == 2));
        assert!(sample.mask.labels().contains(&2));
    }

    #[test]
    fn out_of_range_index_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        write_pair(dir.path(), "a", [0, 0, 1, 1]);

        let pattern = format!("{}/images/*.png", dir.path().display());
        let dataset = AnomalyDataset::discover(&pattern, [2, 2]).unwrap();
        assert!(dataset.load::<TestBackend>(5, &Default::default()).is_err());
    }
}
