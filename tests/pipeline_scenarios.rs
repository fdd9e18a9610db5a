use edge_vision::core_modules::convolution::{BorderPolicy, Kernel, convolve};
use edge_vision::core_modules::gradient::gradient;
use edge_vision::core_modules::grayscale::to_grayscale;
use edge_vision::core_modules::isolation_pruner::{PruneNeighborhood, STRONG_PIXEL_THRESHOLD, prune};
use edge_vision::core_modules::non_max_suppression::suppress;
use edge_vision::core_modules::picture::{HEADER_SIZE, Picture, bitmap_codec, synthetic_header};
use edge_vision::core_modules::pixel::pixel::Pixel;
use edge_vision::core_modules::pixel_buffer::{ByteBuffer, LumaBuffer};
use edge_vision::pipeline::{EdgePipeline, PipelineConfig, edge_detect};
use std::path::PathBuf;
use std::rc::Rc;
use test_log::test;

fn picture_from(width: usize, height: usize, f: impl FnMut(usize, usize) -> Pixel) -> Picture {
    let pixels = ByteBuffer::from_fn(width, height, f).unwrap();
    Picture::new(pixels, Rc::new(synthetic_header(width as i32, height as i32)), "scenario.bmp")
}

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("edge_vision_it_{}_{name}", std::process::id()))
}

/// Black 10x10 picture with a white 3x3 square covering columns and rows 4..=6.
fn square_picture() -> Picture {
    picture_from(10, 10, |x, y| {
        if (4..=6).contains(&x) && (4..=6).contains(&y) {
            Pixel::gray(255)
        } else {
            Pixel::gray(0)
        }
    })
}

/// Gradient magnitude of `picture` after the blur, before any thinning.
fn raw_magnitude(picture: &Picture) -> LumaBuffer {
    let blurred = convolve(&Kernel::gaussian_5x5(), &to_grayscale(picture), BorderPolicy::SkipOutOfBounds).unwrap();
    gradient(blurred, BorderPolicy::SkipOutOfBounds).unwrap().magnitude
}

#[test]
fn all_zero_image_stays_zero_through_every_stage() {
    let luminance = LumaBuffer::new(5, 5).unwrap();
    let blurred = convolve(&Kernel::gaussian_5x5(), &luminance, BorderPolicy::SkipOutOfBounds).unwrap();
    let grad = gradient(blurred, BorderPolicy::SkipOutOfBounds).unwrap();
    let thinned = suppress(grad.magnitude, &grad.direction).unwrap();
    let edges = prune(thinned, STRONG_PIXEL_THRESHOLD, PruneNeighborhood::Full);

    assert!(edges.iter().all(|p| p.luminance() == 0.0));

    let output = edge_detect(&picture_from(5, 5, |_, _| Pixel::gray(0))).unwrap();
    assert!(output.pixels().iter().all(|p| p == Pixel::gray(0)));
}

#[test]
fn bright_square_only_lights_up_where_the_gradient_is_non_zero() {
    let picture = square_picture();
    let magnitude = raw_magnitude(&picture);
    let output = edge_detect(&picture).unwrap();

    let mut lit = 0;
    for y in 0..10 {
        for x in 0..10 {
            if output.pixels().get(x, y).red != 0 {
                assert!(magnitude.luma(x, y) > 0.0, "({x}, {y}) lit without a gradient");
                lit += 1;
            }
        }
    }
    assert!(lit > 0);

    // The square sits closer to the bottom-right corner. That corner still
    // sees a faint gradient, and border pixels keep their raw magnitude.
    for (x, y) in [(0, 0), (9, 0), (0, 9)] {
        assert_eq!(output.pixels().get(x, y), Pixel::gray(0), "corner ({x}, {y})");
    }
    assert_eq!(
        output.pixels().get(9, 9),
        Pixel::gray(magnitude.luma(9, 9) as u8)
    );
}

#[test]
fn square_center_is_suppressed() {
    let output = edge_detect(&square_picture()).unwrap();
    assert_eq!(output.pixels().get(5, 5), Pixel::gray(0));
}

#[test]
fn dimensions_survive_odd_shapes() {
    for (width, height) in [(1, 1), (2, 9), (17, 3), (33, 21)] {
        let input = picture_from(width, height, |x, y| Pixel::new((x * 7) as u8, (y * 11) as u8, 40));
        let output = edge_detect(&input).unwrap();
        assert_eq!((output.width(), output.height()), (width, height));
    }
}

#[test]
fn grayscale_dump_round_trips_through_the_file_system() {
    let source = temp_path("round_trip_src.bmp");
    let dump = temp_path("round_trip_gray.bmp");

    let mut bytes = synthetic_header(8, 4).to_vec();
    for i in 0..32u8 {
        bytes.extend_from_slice(&[i * 3, i * 5, i * 7]);
    }
    std::fs::write(&source, &bytes).unwrap();

    let original = bitmap_codec::decode(&source).unwrap();
    bitmap_codec::encode_grayscale(&dump, original.header(), &to_grayscale(&original)).unwrap();
    let first = bitmap_codec::decode(&dump).unwrap();

    bitmap_codec::encode_grayscale(&dump, first.header(), &to_grayscale(&first)).unwrap();
    let second = bitmap_codec::decode(&dump).unwrap();

    assert_eq!(first.header().as_slice(), &bytes[..HEADER_SIZE]);
    assert_eq!(second.header(), first.header());
    assert_eq!(second.pixels().to_vec(), first.pixels().to_vec());

    std::fs::remove_file(source).ok();
    std::fs::remove_file(dump).ok();
}

#[test]
fn edge_map_written_as_bitmap_reads_back_identically() {
    let path = temp_path("edges.bmp");
    let output = edge_detect(&square_picture()).unwrap();
    bitmap_codec::encode_picture(&path, &output).unwrap();

    let decoded = bitmap_codec::decode(&path).unwrap();
    assert_eq!(decoded.header(), output.header());
    assert_eq!(decoded.pixels().to_vec(), output.pixels().to_vec());
    std::fs::remove_file(path).ok();
}

// Legacy pruning inspects east twice and never south-east. A strong pixel whose
// only support sits to its south-east is kept by `Full` and dropped by `Legacy`.
#[test]
fn legacy_pruning_ignores_south_east_support() {
    let build = || {
        let buffer = LumaBuffer::new(5, 5).unwrap();
        buffer.set_luma(1, 1, 100.0);
        buffer.set_luma(2, 2, 100.0);
        buffer
    };

    let full = prune(build(), STRONG_PIXEL_THRESHOLD, PruneNeighborhood::Full);
    assert_eq!(full.luma(1, 1), 100.0);

    let legacy = prune(build(), STRONG_PIXEL_THRESHOLD, PruneNeighborhood::Legacy);
    assert_eq!(legacy.luma(1, 1), 0.0);
    // (2, 2) is examined after (1, 1) was cleared, so it has lost its support too.
    assert_eq!(legacy.luma(2, 2), 0.0);
}

#[test]
fn legacy_and_full_agree_on_the_square() {
    let picture = square_picture();
    let legacy = EdgePipeline::new(PipelineConfig {
        prune_neighborhood: PruneNeighborhood::Legacy,
        ..PipelineConfig::default()
    })
    .edge_detect(&picture)
    .unwrap();
    let full = EdgePipeline::default().edge_detect(&picture).unwrap();

    // Every pixel Legacy keeps, Full keeps as well.
    for (l, f) in legacy.pixels().iter().zip(full.pixels().iter()) {
        if l.red != 0 {
            assert_eq!(l, f);
        }
    }
}
