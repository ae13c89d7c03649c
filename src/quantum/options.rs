
//! Parse the `quantum:*` image options that configure a `QuantumInfo`.

use std::str::FromStr;
use crate::error::{Error, Result};
use crate::io::Endianness;
use super::QuantumFormat;


/// The options a format coder may pass when acquiring a `QuantumInfo`.
/// Unset options keep the defaults of the quantum info.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantumOptions {

    /// `quantum:format`
    pub format: Option<QuantumFormat>,

    /// `quantum:minimum`, the external value of black.
    pub minimum: Option<f64>,

    /// `quantum:maximum`, the external value of white.
    pub maximum: Option<f64>,

    /// `quantum:scale`, overrides the scale derived from minimum and maximum.
    pub scale: Option<f64>,

    /// `quantum:polarity`, whether zero means white.
    pub min_is_white: Option<bool>,

    /// `endian`, the byte order of multi-byte samples.
    pub endian: Option<Endianness>,
}

impl QuantumOptions {

    /// Parse key value pairs, as stored in the options of an image.
    /// Keys that are not quantum options are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Result<Self>
        where K: AsRef<str>, V: AsRef<str>
    {
        let mut options = QuantumOptions::default();

        for (key, value) in pairs {
            let (key, value) = (key.as_ref(), value.as_ref().trim());

            match key {
                "quantum:format" => options.format = Some(parse_format(value)?),
                "quantum:minimum" => options.minimum = Some(parse_number(key, value)?),
                "quantum:maximum" => options.maximum = Some(parse_number(key, value)?),
                "quantum:scale" => options.scale = Some(parse_number(key, value)?),
                "quantum:polarity" => options.min_is_white = Some(parse_polarity(value)?),
                "endian" => options.endian = Some(parse_endian(value)?),

                unknown if unknown.starts_with("quantum:") =>
                    return Err(Error::option(format!("unrecognized option `{}`", unknown))),

                _ => {},
            }
        }

        Ok(options)
    }
}

fn parse_number(key: &str, value: &str) -> Result<f64> {
    f64::from_str(value).ok()
        .filter(|number| number.is_finite())
        .ok_or_else(|| Error::option(format!("invalid value `{}` for `{}`", value, key)))
}

fn parse_format(value: &str) -> Result<QuantumFormat> {
    match value.to_ascii_lowercase().as_str() {
        "undefined" => Ok(QuantumFormat::Undefined),
        "floating-point" => Ok(QuantumFormat::FloatingPoint),
        "signed" => Ok(QuantumFormat::Signed),
        "unsigned" => Ok(QuantumFormat::Unsigned),
        _ => Err(Error::option(format!("unrecognized quantum format `{}`", value))),
    }
}

fn parse_polarity(value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "min-is-white" => Ok(true),
        "min-is-black" => Ok(false),
        _ => Err(Error::option(format!("unrecognized polarity `{}`", value))),
    }
}

fn parse_endian(value: &str) -> Result<Endianness> {
    match value.to_ascii_lowercase().as_str() {
        "undefined" => Ok(Endianness::Undefined),
        "lsb" => Ok(Endianness::Lsb),
        "msb" => Ok(Endianness::Msb),
        _ => Err(Error::option(format!("unrecognized endianness `{}`", value))),
    }
}


#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_all(){
        let options = QuantumOptions::from_pairs(vec![
            ("quantum:format", "Floating-Point"),
            ("quantum:minimum", "-1.5"),
            ("quantum:maximum", " 2 "),
            ("quantum:polarity", "min-is-white"),
            ("endian", "LSB"),
            ("jpeg:quality", "whatever"),
        ]).unwrap();

        assert_eq!(options, QuantumOptions {
            format: Some(QuantumFormat::FloatingPoint),
            minimum: Some(-1.5),
            maximum: Some(2.0),
            scale: None,
            min_is_white: Some(true),
            endian: Some(Endianness::Lsb),
        });
    }

    #[test]
    fn reject_invalid(){
        for &(key, value) in &[
            ("quantum:format", "complex"),
            ("quantum:scale", "a lot"),
            ("quantum:scale", "inf"),
            ("quantum:polarity", "white"),
            ("quantum:threshold", "3"),
            ("endian", "middle"),
        ] {
            let result = QuantumOptions::from_pairs(Some((key, value)));
            assert!(matches!(result, Err(Error::Option(_))), "{} = {}", key, value);
        }
    }
}
