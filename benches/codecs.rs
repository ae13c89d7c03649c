#[macro_use]
extern crate bencher;

extern crate quantum_transcode;
use quantum_transcode::prelude::*;
use quantum_transcode::compression::{ascii85, fax, lzw, packbits, zlib};

use bencher::Bencher;


/// Packed bytes with runs and noise, like a scanned document
fn scanline_bytes() -> Vec<u8> {
    (0 .. 256 * 1024_usize)
        .map(|index| if (index / 97) % 3 == 0 { (index * 31 % 251) as u8 } else { 0xff })
        .collect()
}

fn page() -> Image {
    let mut image = Image::new("page.fax", (1728, 256), Colorspace::Gray, false).unwrap();
    for (index, sample) in image.samples_mut().iter_mut().enumerate() {
        *sample = if (index / 13) % 7 == 0 { 0.0 } else { QUANTUM_RANGE };
    }

    image
}

fn compress_lzw(bench: &mut Bencher) {
    let data = scanline_bytes();
    bench.iter(||{
        bencher::black_box(lzw::compress_bytes(&data).unwrap());
    })
}

fn compress_packbits(bench: &mut Bencher) {
    let data = scanline_bytes();
    bench.iter(||{
        bencher::black_box(packbits::compress_bytes(&data));
    })
}

fn encode_ascii85(bench: &mut Bencher) {
    let data = scanline_bytes();
    bench.iter(||{
        bencher::black_box(ascii85::encode(&data).unwrap());
    })
}

fn compress_zlib(bench: &mut Bencher) {
    let data = scanline_bytes();
    bench.iter(||{
        bencher::black_box(zlib::compress_bytes(&data, zlib::compression_level(0)).ok());
    })
}

fn encode_fax_page(bench: &mut Bencher) {
    let image = page();
    bench.iter(||{
        let mut bytes = Vec::new();
        fax::encode_image(&image, FaxTarget::Raw, &mut bytes, &ResourceLimits::default(), &mut ()).unwrap();
        bencher::black_box(bytes);
    })
}

fn decode_fax_page(bench: &mut Bencher) {
    let mut bytes = Vec::new();
    fax::encode_image(&page(), FaxTarget::Raw, &mut bytes, &ResourceLimits::default(), &mut ()).unwrap();

    bench.iter(||{
        let mut decoded = Image::bilevel("page.fax", (1728, 256)).unwrap();
        fax::decode_image(bytes.as_slice(), &mut decoded, &ResourceLimits::default(), &mut ()).unwrap();
        bencher::black_box(decoded);
    })
}

benchmark_group!(codecs,
    compress_lzw,
    compress_packbits,
    encode_ascii85,
    compress_zlib,
    encode_fax_page,
    decode_fax_page,
);

benchmark_main!(codecs);
