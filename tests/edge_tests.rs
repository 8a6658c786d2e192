use blockcam::processing::cpu;
use blockcam::{Color, EdgeExtents, Reducer, ScanningParameters, SourceImage};
use image::{Rgba, RgbaImage};

const BACKGROUND: [u8; 4] = [255, 255, 255, 255];
const INK: Rgba<u8> = Rgba([20, 40, 60, 255]);

fn canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width, height, Rgba(BACKGROUND))
}

fn white() -> ScanningParameters {
    ScanningParameters::exact(Color::from_rgba8(BACKGROUND)).unwrap()
}

#[test]
fn uniform_background_reports_no_content() {
    let image = SourceImage::new(canvas(12, 9)).unwrap();
    let extents = Reducer::cpu().find_edges(&image, &white()).unwrap();
    assert!(extents.is_empty());
    assert_eq!(extents, EdgeExtents::default());
    assert_eq!(extents.as_rect(), None);
}

#[test]
fn single_pixel_is_found_exactly() {
    let reducer = Reducer::cpu();
    for (x0, y0) in [(0, 0), (5, 3), (11, 8), (0, 8), (11, 0)] {
        let mut img = canvas(12, 9);
        img.put_pixel(x0, y0, INK);
        let image = SourceImage::new(img).unwrap();
        let extents = reducer.find_edges(&image, &white()).unwrap();
        assert_eq!(
            extents,
            EdgeExtents {
                top: y0,
                left: x0,
                bottom: y0,
                right: x0
            },
            "pixel at ({x0},{y0})"
        );
    }
}

#[test]
fn filled_rectangle_bounds_are_exact() {
    let mut img = canvas(40, 30);
    for y in 7..=19 {
        for x in 3..=28 {
            img.put_pixel(x, y, INK);
        }
    }
    let image = SourceImage::new(img).unwrap();
    let extents = Reducer::cpu().find_edges(&image, &white()).unwrap();
    assert_eq!(
        extents,
        EdgeExtents {
            top: 7,
            left: 3,
            bottom: 19,
            right: 28
        }
    );
    assert_eq!(extents.as_rect(), Some((3, 7, 26, 13)));
}

#[test]
fn scattered_pixels_bound_their_union() {
    let mut img = canvas(20, 20);
    img.put_pixel(4, 15, INK);
    img.put_pixel(17, 2, INK);
    img.put_pixel(9, 9, INK);
    let image = SourceImage::new(img).unwrap();
    let extents = cpu::find_edges(&image, &white());
    assert_eq!(
        extents,
        EdgeExtents {
            top: 2,
            left: 4,
            bottom: 15,
            right: 17
        }
    );
}

#[test]
fn one_pixel_tall_image_is_not_mistaken_for_empty() {
    let mut img = canvas(6, 1);
    img.put_pixel(2, 0, INK);
    let image = SourceImage::new(img).unwrap();
    let extents = cpu::find_edges(&image, &white());
    assert!(!extents.is_empty());
    assert_eq!((extents.top, extents.bottom, extents.left, extents.right), (0, 0, 2, 2));
}

#[test]
fn tolerance_ignores_near_background_noise() {
    let mut img = canvas(10, 10);
    img.put_pixel(1, 1, Rgba([250, 252, 255, 255]));
    img.put_pixel(6, 7, INK);
    let image = SourceImage::new(img).unwrap();

    let exact = cpu::find_edges(&image, &white());
    assert_eq!((exact.top, exact.left), (1, 1));

    let lenient = ScanningParameters::new(Color::from_rgba8(BACKGROUND), 8).unwrap();
    let extents = cpu::find_edges(&image, &lenient);
    assert_eq!(
        extents,
        EdgeExtents {
            top: 7,
            left: 6,
            bottom: 7,
            right: 6
        }
    );
}

#[test]
fn alpha_differences_count_as_content() {
    let mut img = canvas(5, 5);
    img.put_pixel(3, 2, Rgba([255, 255, 255, 0]));
    let image = SourceImage::new(img).unwrap();
    let extents = cpu::find_edges(&image, &white());
    assert_eq!(extents.as_rect(), Some((3, 2, 1, 1)));
}

#[test]
fn crop_returns_the_content_region() {
    let mut img = canvas(16, 16);
    for y in 4..8 {
        for x in 10..13 {
            img.put_pixel(x, y, INK);
        }
    }
    let image = SourceImage::new(img).unwrap();
    let extents = cpu::find_edges(&image, &white());
    let cropped = extents.crop(&image).expect("content present");
    assert_eq!((cropped.width(), cropped.height()), (3, 4));
    assert!(cropped.as_rgba().pixels().all(|p| *p == INK));

    assert!(EdgeExtents::default().crop(&image).is_none());
}

#[test]
fn repeated_scans_agree() {
    let img = RgbaImage::from_fn(33, 21, |x, y| {
        if (x * 7 + y * 3) % 11 == 0 && x > 4 && y > 2 {
            INK
        } else {
            Rgba(BACKGROUND)
        }
    });
    let image = SourceImage::new(img).unwrap();
    let reducer = Reducer::cpu();
    let first = reducer.find_edges(&image, &white()).unwrap();
    let second = reducer.find_edges(&image, &white()).unwrap();
    assert_eq!(first, second);
}
