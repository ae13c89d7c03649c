extern crate quantum_transcode;

use quantum_transcode::prelude::*;
use quantum_transcode::quantum::set_quantum_image_type;
use quantum_transcode::image::ImageType;
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;


fn random_image(random: &mut StdRng, size: (usize, usize), colorspace: Colorspace, alpha: bool) -> Image {
    let mut image = Image::new("random.raw", size, colorspace, alpha).unwrap();
    for sample in image.samples_mut() {
        *sample = random.random_range(0 ..= 65535_u32) as f32;
    }

    image
}

fn limits(threads: usize) -> ResourceLimits {
    ResourceLimits { threads: Some(threads), .. Default::default() }
}

fn acquire(image: &Image, options: &QuantumOptions, threads: usize) -> QuantumInfo {
    QuantumInfo::acquire(image, options, limits(threads)).unwrap()
}


#[test]
fn packed_rows_have_the_exact_extent(){
    let mut random = StdRng::seed_from_u64(7);

    let cases = [
        (Colorspace::Srgb, true, &[
            QuantumType::Alpha, QuantumType::Opacity, QuantumType::Red, QuantumType::Green, QuantumType::Blue,
            QuantumType::Gray, QuantumType::GrayAlpha, QuantumType::RGB, QuantumType::RGBA, QuantumType::RGBO,
            QuantumType::BGR, QuantumType::BGRA, QuantumType::BGRO, QuantumType::CbYCr, QuantumType::CbYCrA,
            QuantumType::Multispectral,
        ][..]),

        (Colorspace::Cmyk, true, &[
            QuantumType::Cyan, QuantumType::Magenta, QuantumType::Yellow, QuantumType::Black,
            QuantumType::CMYK, QuantumType::CMYKA, QuantumType::CMYKO,
        ][..]),

        (Colorspace::Gray, false, &[ QuantumType::Gray, QuantumType::Multispectral ][..]),
    ];

    for &(colorspace, alpha, quantum_types) in &cases {
        let image = random_image(&mut random, (13, 2), colorspace, alpha);

        for &depth in &[ 1, 2, 4, 7, 8, 10, 12, 16, 24, 32, 48, 64 ] {
            for &pack in &[ true, false ] {
                for &pad in &[ 0, 3 ] {
                    let mut info = acquire(&image, &QuantumOptions::default(), 1);
                    info.set_depth(depth).unwrap();
                    info.set_pack(pack);
                    info.set_pad(pad).unwrap();

                    for &quantum_type in quantum_types {
                        let extent = info.extent(&image, quantum_type).unwrap();
                        let mut bytes = vec![ 0_u8; extent ];

                        let written = info.export_row(&image, quantum_type, 1, &mut bytes).unwrap();
                        assert_eq!(written, extent, "{:?} at depth {}, pack {}, pad {}", quantum_type, depth, pack, pad);
                    }
                }
            }
        }
    }
}

#[test]
fn floating_point_rows_have_the_exact_extent(){
    let mut random = StdRng::seed_from_u64(8);
    let image = random_image(&mut random, (9, 3), Colorspace::Srgb, true);

    let options = QuantumOptions { format: Some(QuantumFormat::FloatingPoint), .. Default::default() };
    let mut info = acquire(&image, &options, 1);

    for &(depth, bytes_per_sample) in &[ (16, 2), (24, 3), (32, 4), (64, 8) ] {
        info.set_depth(depth).unwrap();

        let packed = info.export_image(&image, QuantumType::RGBA, &mut ()).unwrap();
        assert_eq!(packed.len(), 9 * 3 * 4 * bytes_per_sample);
    }
}

#[test]
fn integer_samples_survive_a_round_trip(){
    let mut random = StdRng::seed_from_u64(9);
    let image = random_image(&mut random, (31, 17), Colorspace::Srgb, true);

    for &format in &[ QuantumFormat::Unsigned, QuantumFormat::Signed ] {
        for &depth in &[ 16, 32, 64 ] {
            for &endian in &[ Endianness::Lsb, Endianness::Msb ] {
                let options = QuantumOptions { format: Some(format), endian: Some(endian), .. Default::default() };
                let mut info = acquire(&image, &options, 3);
                info.set_depth(depth).unwrap();

                let packed = info.export_image(&image, QuantumType::RGBA, &mut ()).unwrap();

                let mut decoded = Image::new("decoded.raw", (31, 17), Colorspace::Srgb, true).unwrap();
                info.import_image(&mut decoded, QuantumType::RGBA, &packed, &mut ()).unwrap();
                assert_eq!(decoded.samples(), image.samples(), "{:?} {} bit {:?}", format, depth, endian);
            }
        }
    }
}

#[test]
fn parallel_packing_matches_sequential_packing(){
    let mut random = StdRng::seed_from_u64(10);
    let image = random_image(&mut random, (33, 70), Colorspace::Srgb, false);

    let mut sequential = acquire(&image, &QuantumOptions::default(), 1);
    let mut parallel = acquire(&image, &QuantumOptions::default(), 5);

    for info in &mut [ &mut sequential, &mut parallel ] {
        info.set_depth(5).unwrap();
        info.set_pad(1).unwrap();
    }

    let expected = sequential.export_image(&image, QuantumType::BGR, &mut ()).unwrap();
    assert_eq!(parallel.export_image(&image, QuantumType::BGR, &mut ()).unwrap(), expected);

    let mut streamed = Vec::new();
    let mut next_row = 0;
    parallel.for_each_packed_row(&image, QuantumType::BGR, &mut (), |y, row| {
        assert_eq!(y, next_row);
        next_row += 1;
        streamed.extend_from_slice(row);
        Ok(())
    }).unwrap();

    assert_eq!(next_row, 70);
    assert_eq!(streamed, expected);
}

#[test]
fn floating_point_depth_is_clamped(){
    let image = Image::new("float.raw", (2, 2), Colorspace::Gray, false).unwrap();
    let options = QuantumOptions::from_pairs(vec![ ("quantum:format", "floating-point") ]).unwrap();
    let mut info = acquire(&image, &options, 1);

    for &(requested, effective) in &[ (70, 64), (20, 24), (15, 16) ] {
        info.set_depth(requested).unwrap();
        assert_eq!(info.depth(), effective);
    }
}

#[test]
fn zero_depth_packs_single_bits(){
    let mut image = Image::new("signed.raw", (10, 2), Colorspace::Gray, false).unwrap();
    for (x, sample) in image.row_mut(1).iter_mut().enumerate() {
        *sample = if x % 3 == 0 { QUANTUM_RANGE } else { 0.0 };
    }

    let options = QuantumOptions { format: Some(QuantumFormat::Signed), .. Default::default() };
    let mut info = acquire(&image, &options, 1);
    info.set_depth(0).unwrap();
    assert_eq!(info.depth(), 1);

    let extent = info.extent(&image, QuantumType::Gray).unwrap();
    assert_eq!(extent, 2);

    let mut bytes = vec![ 0_u8; extent ];
    assert_eq!(info.export_row(&image, QuantumType::Gray, 1, &mut bytes).unwrap(), extent);

    let packed = info.export_image(&image, QuantumType::Gray, &mut ()).unwrap();
    assert_eq!(packed.len(), 2 * extent);
}

#[test]
fn equal_minimum_and_maximum_define_the_scale(){
    let mut image = Image::new("scaled.raw", (1, 1), Colorspace::Gray, false).unwrap();
    image.samples_mut()[0] = QUANTUM_RANGE;

    let options = QuantumOptions::from_pairs(vec![
        ("quantum:format", "floating-point"),
        ("quantum:minimum", "5"),
        ("quantum:maximum", "5"),
    ]).unwrap();

    let mut info = acquire(&image, &options, 1);
    assert_eq!(info.scale(), f64::from(QUANTUM_RANGE) / 5.0);
    assert_eq!(info.minimum(), 0.0);

    info.set_depth(32).unwrap();
    let packed = info.export_image(&image, QuantumType::Gray, &mut ()).unwrap();
    let value = f32::from_be_bytes([ packed[0], packed[1], packed[2], packed[3] ]);
    assert!((value - 5.0).abs() < 1.0e-4, "exported {}", value);
}

#[test]
fn invalid_colormap_indices_are_reported_after_unpacking(){
    let mut image = Image::new("palette.raw", (4, 1), Colorspace::Srgb, false).unwrap()
        .with_colormap(vec![ Color::rgb(0.0, 0.0, 0.0), Color::rgb(QUANTUM_RANGE, 0.0, 0.0) ]).unwrap();

    let info = acquire(&image, &QuantumOptions::default(), 1);
    let result = info.import_image(&mut image, QuantumType::Index, &[ 1, 9, 0, 1 ], &mut ());

    match result {
        Err(Error::CorruptImage(message)) => assert!(message.contains("palette.raw"), "{}", message),
        other => panic!("unexpected result {:?}", other),
    }

    let red: Vec<Quantum> = image.row(0).chunks_exact(image.channel_count())
        .map(|pixel| image.layout().channel(pixel, PixelChannel::Red))
        .collect();

    assert_eq!(red, vec![ QUANTUM_RANGE, 0.0, 0.0, QUANTUM_RANGE ]);
}

#[test]
fn image_type_follows_the_quantum_type(){
    let mut image = Image::new("types.raw", (1, 1), Colorspace::Srgb, true).unwrap();
    assert_eq!(quantum_transcode::quantum::quantum_type(&image), QuantumType::RGBA);

    set_quantum_image_type(&mut image, QuantumType::Gray);
    assert_eq!(image.image_type, ImageType::Grayscale);

    set_quantum_image_type(&mut image, QuantumType::CMYK);
    assert_eq!(image.image_type, ImageType::ColorSeparation);
}

#[test]
fn random_bytes_never_panic(){
    let mut random = StdRng::seed_from_u64(11);

    let mut image = Image::new("fuzz.raw", (11, 5), Colorspace::Srgb, true).unwrap()
        .with_colormap(vec![ Color::gray(0.0); 3 ]).unwrap();

    for _ in 0 .. 200 {
        let format = match random.random_range(0 .. 3) {
            0 => QuantumFormat::Unsigned,
            1 => QuantumFormat::Signed,
            _ => QuantumFormat::FloatingPoint,
        };

        let quantum_type = match random.random_range(0 .. 4) {
            0 => QuantumType::RGBA,
            1 => QuantumType::IndexAlpha,
            2 => QuantumType::Opacity,
            _ => QuantumType::Multispectral,
        };

        let options = QuantumOptions { format: Some(format), .. Default::default() };
        let mut info = acquire(&image, &options, random.random_range(1 .. 4));
        info.set_depth(random.random_range(1 ..= 64)).unwrap();
        info.set_pack(random.random());

        let mut bytes = vec![ 0_u8; info.extent(&image, quantum_type).unwrap() * image.rows() ];
        random.fill(bytes.as_mut_slice());

        match info.import_image(&mut image, quantum_type, &bytes, &mut ()) {
            Ok(()) | Err(Error::CorruptImage(_)) => {},
            Err(error) => panic!("{:?} at depth {}: {}", quantum_type, info.depth(), error),
        }

        assert!(image.samples().iter().all(|sample| sample.is_finite()));
    }
}
