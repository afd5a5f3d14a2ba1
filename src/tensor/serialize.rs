//! Tagged binary codec for tensor expressions.
//!
//! Every tensor record is a header (name, glyph, index sequence) followed
//! by a kind tag and the per-variant payload; children recurse. Integers
//! are little-endian, strings length-prefixed UTF-8. An unknown kind tag
//! deserialises as a header-only placeholder (kind `Zero`), so streams
//! written by newer variants degrade instead of failing.

use std::io::{Read, Write};

use num_rational::Rational64;

use crate::error::{TensorError, TensorResult};
use crate::index::{Index, IndexRange, Indices};
use crate::scalar::Scalar;
use crate::tensor::expr::{Tensor, TensorKind};

// Kind tags on the wire. The numbering groups the variants: algebra nodes
// low, atoms in the 100/200 block, substitutions at 300.
const TAG_ADDED: u32 = 1;
const TAG_MULTIPLIED: u32 = 2;
const TAG_SCALED: u32 = 3;
const TAG_ZERO: u32 = 4;
const TAG_SCALAR: u32 = 101;
const TAG_EPSILON: u32 = 201;
const TAG_GAMMA: u32 = 202;
const TAG_EPSILON_GAMMA: u32 = 203;
const TAG_DELTA: u32 = 204;
const TAG_SUBSTITUTE: u32 = 301;

const SCALAR_TAG_RATIONAL: u8 = 1;
const SCALAR_TAG_VARIABLE: u8 = 2;
const SCALAR_TAG_ADDED: u8 = 3;
const SCALAR_TAG_MULTIPLIED: u8 = 4;

fn io_error(error: std::io::Error) -> TensorError {
    TensorError::WrongFormat(error.to_string())
}

// ============================================================================
// PRIMITIVES
// ============================================================================

fn write_u8<W: Write>(writer: &mut W, value: u8) -> TensorResult<()> {
    writer.write_all(&[value]).map_err(io_error)
}

fn read_u8<R: Read>(reader: &mut R) -> TensorResult<u8> {
    let mut buffer = [0u8; 1];
    reader.read_exact(&mut buffer).map_err(io_error)?;
    Ok(buffer[0])
}

fn write_u32<W: Write>(writer: &mut W, value: u32) -> TensorResult<()> {
    writer.write_all(&value.to_le_bytes()).map_err(io_error)
}

fn read_u32<R: Read>(reader: &mut R) -> TensorResult<u32> {
    let mut buffer = [0u8; 4];
    reader.read_exact(&mut buffer).map_err(io_error)?;
    Ok(u32::from_le_bytes(buffer))
}

fn write_i64<W: Write>(writer: &mut W, value: i64) -> TensorResult<()> {
    writer.write_all(&value.to_le_bytes()).map_err(io_error)
}

fn read_i64<R: Read>(reader: &mut R) -> TensorResult<i64> {
    let mut buffer = [0u8; 8];
    reader.read_exact(&mut buffer).map_err(io_error)?;
    Ok(i64::from_le_bytes(buffer))
}

fn write_string<W: Write>(writer: &mut W, value: &str) -> TensorResult<()> {
    write_u32(writer, value.len() as u32)?;
    writer.write_all(value.as_bytes()).map_err(io_error)
}

// Upper bound on string payloads; anything larger is a corrupt stream,
// not a tensor name.
const MAX_STRING_LENGTH: usize = 1 << 20;

fn read_string<R: Read>(reader: &mut R) -> TensorResult<String> {
    let length = read_u32(reader)? as usize;
    if length > MAX_STRING_LENGTH {
        return Err(TensorError::WrongFormat(format!(
            "string length {} exceeds the record limit",
            length
        )));
    }
    let mut buffer = vec![0u8; length];
    reader.read_exact(&mut buffer).map_err(io_error)?;
    String::from_utf8(buffer).map_err(|e| TensorError::WrongFormat(e.to_string()))
}

// ============================================================================
// INDICES
// ============================================================================

fn write_index<W: Write>(writer: &mut W, index: &Index) -> TensorResult<()> {
    write_string(writer, index.name())?;
    write_string(writer, index.printable())?;
    write_u32(writer, index.range().from() as u32)?;
    write_u32(writer, index.range().to() as u32)?;
    write_u8(writer, index.is_contravariant() as u8)
}

fn read_index<R: Read>(reader: &mut R) -> TensorResult<Index> {
    let name = read_string(reader)?;
    let printable = read_string(reader)?;
    let from = read_u32(reader)? as usize;
    let to = read_u32(reader)? as usize;
    if from > to {
        return Err(TensorError::WrongFormat(format!(
            "empty index range {}..{}",
            from, to
        )));
    }
    let contravariant = read_u8(reader)? != 0;

    let mut index = Index::new(name, printable, IndexRange::new(from, to));
    index.set_contravariant(contravariant);
    Ok(index)
}

fn write_indices<W: Write>(writer: &mut W, indices: &Indices) -> TensorResult<()> {
    write_u32(writer, indices.len() as u32)?;
    for index in indices.iter() {
        write_index(writer, index)?;
    }
    Ok(())
}

fn read_indices<R: Read>(reader: &mut R) -> TensorResult<Indices> {
    let count = read_u32(reader)? as usize;
    let mut indices = Indices::empty();
    for _ in 0..count {
        indices.push(read_index(reader)?);
    }
    Ok(indices)
}

// ============================================================================
// SCALARS
// ============================================================================

impl Scalar {
    /// Write the scalar as a tagged record.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> TensorResult<()> {
        match self {
            Scalar::Rational(rational) => {
                write_u8(writer, SCALAR_TAG_RATIONAL)?;
                write_i64(writer, *rational.numer())?;
                write_i64(writer, *rational.denom())
            }
            Scalar::Variable { name, index } => {
                write_u8(writer, SCALAR_TAG_VARIABLE)?;
                write_string(writer, name)?;
                write_u32(writer, *index)
            }
            Scalar::Added(summands) => {
                write_u8(writer, SCALAR_TAG_ADDED)?;
                write_u32(writer, summands.len() as u32)?;
                for summand in summands {
                    summand.write_to(writer)?;
                }
                Ok(())
            }
            Scalar::Multiplied(left, right) => {
                write_u8(writer, SCALAR_TAG_MULTIPLIED)?;
                left.write_to(writer)?;
                right.write_to(writer)
            }
        }
    }

    /// Read a tagged scalar record.
    pub fn read_from<R: Read>(reader: &mut R) -> TensorResult<Scalar> {
        match read_u8(reader)? {
            SCALAR_TAG_RATIONAL => {
                let numerator = read_i64(reader)?;
                let denominator = read_i64(reader)?;
                if denominator <= 0 {
                    return Err(TensorError::WrongFormat(
                        "rational denominator must be positive".into(),
                    ));
                }
                Ok(Scalar::Rational(Rational64::new(numerator, denominator)))
            }
            SCALAR_TAG_VARIABLE => {
                let name = read_string(reader)?;
                let index = read_u32(reader)?;
                Ok(Scalar::Variable { name, index })
            }
            SCALAR_TAG_ADDED => {
                let count = read_u32(reader)? as usize;
                let mut summands = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    summands.push(Scalar::read_from(reader)?);
                }
                Ok(Scalar::Added(summands))
            }
            SCALAR_TAG_MULTIPLIED => {
                let left = Scalar::read_from(reader)?;
                let right = Scalar::read_from(reader)?;
                Ok(Scalar::Multiplied(Box::new(left), Box::new(right)))
            }
            tag => Err(TensorError::WrongFormat(format!(
                "unknown scalar tag {}",
                tag
            ))),
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut bytes);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> TensorResult<Scalar> {
        let mut reader = bytes;
        Scalar::read_from(&mut reader)
    }
}

// ============================================================================
// TENSORS
// ============================================================================

impl Tensor {
    fn kind_tag(&self) -> u32 {
        match &self.kind {
            TensorKind::Added { .. } => TAG_ADDED,
            TensorKind::Multiplied { .. } => TAG_MULTIPLIED,
            TensorKind::Scaled { .. } => TAG_SCALED,
            TensorKind::Zero => TAG_ZERO,
            TensorKind::Scalar { .. } => TAG_SCALAR,
            TensorKind::Epsilon => TAG_EPSILON,
            TensorKind::Gamma { .. } => TAG_GAMMA,
            TensorKind::EpsilonGamma { .. } => TAG_EPSILON_GAMMA,
            TensorKind::Delta => TAG_DELTA,
            TensorKind::Substitute { .. } => TAG_SUBSTITUTE,
        }
    }

    /// Serialize the expression as a tagged record stream.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> TensorResult<()> {
        write_string(writer, &self.name)?;
        write_string(writer, &self.printable)?;
        write_indices(writer, &self.indices)?;
        write_u32(writer, self.kind_tag())?;

        match &self.kind {
            TensorKind::Zero | TensorKind::Delta | TensorKind::Epsilon => Ok(()),
            TensorKind::Scalar { value } => value.write_to(writer),
            TensorKind::Gamma { signature } => {
                write_u32(writer, signature.0)?;
                write_u32(writer, signature.1)
            }
            TensorKind::EpsilonGamma {
                num_epsilon,
                num_gamma,
            } => {
                write_u32(writer, *num_epsilon as u32)?;
                write_u32(writer, *num_gamma as u32)
            }
            TensorKind::Scaled { tensor, scale } => {
                scale.write_to(writer)?;
                tensor.write_to(writer)
            }
            TensorKind::Added { summands } => {
                write_u32(writer, summands.len() as u32)?;
                for summand in summands {
                    summand.write_to(writer)?;
                }
                Ok(())
            }
            TensorKind::Multiplied { left, right } => {
                left.write_to(writer)?;
                right.write_to(writer)
            }
            TensorKind::Substitute { tensor } => tensor.write_to(writer),
        }
    }

    /// Deserialize a tagged record stream.
    ///
    /// Unknown kind tags produce a header-only placeholder that evaluates
    /// to zero everywhere.
    pub fn read_from<R: Read>(reader: &mut R) -> TensorResult<Tensor> {
        let name = read_string(reader)?;
        let printable = read_string(reader)?;
        let indices = read_indices(reader)?;
        let tag = read_u32(reader)?;

        let kind = match tag {
            TAG_ZERO => TensorKind::Zero,
            TAG_DELTA => {
                if indices.len() != 2 {
                    return Err(TensorError::WrongFormat(
                        "delta must carry exactly two indices".into(),
                    ));
                }
                TensorKind::Delta
            }
            TAG_EPSILON => {
                if indices.is_empty() || indices.len() != indices[0].range().len() {
                    return Err(TensorError::WrongFormat(
                        "epsilon rank must equal its range size".into(),
                    ));
                }
                TensorKind::Epsilon
            }
            TAG_SCALAR => TensorKind::Scalar {
                value: Scalar::read_from(reader)?,
            },
            TAG_GAMMA => {
                if indices.len() != 2 {
                    return Err(TensorError::WrongFormat(
                        "gamma must carry exactly two indices".into(),
                    ));
                }
                let p = read_u32(reader)?;
                let q = read_u32(reader)?;
                TensorKind::Gamma { signature: (p, q) }
            }
            TAG_EPSILON_GAMMA => {
                let num_epsilon = read_u32(reader)? as usize;
                let num_gamma = read_u32(reader)? as usize;
                if num_epsilon > 1 || 3 * num_epsilon + 2 * num_gamma != indices.len() {
                    return Err(TensorError::WrongFormat(
                        "epsilon-gamma factor counts do not match the indices".into(),
                    ));
                }
                TensorKind::EpsilonGamma {
                    num_epsilon,
                    num_gamma,
                }
            }
            TAG_SCALED => {
                let scale = Scalar::read_from(reader)?;
                let tensor = Tensor::read_from(reader)?;
                TensorKind::Scaled {
                    tensor: Box::new(tensor),
                    scale,
                }
            }
            TAG_ADDED => {
                let count = read_u32(reader)? as usize;
                let mut summands = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    summands.push(Tensor::read_from(reader)?);
                }
                TensorKind::Added { summands }
            }
            TAG_MULTIPLIED => {
                let left = Tensor::read_from(reader)?;
                let right = Tensor::read_from(reader)?;
                TensorKind::Multiplied {
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }
            TAG_SUBSTITUTE => {
                let tensor = Tensor::read_from(reader)?;
                if !indices.is_permutation_of(tensor.indices()) {
                    return Err(TensorError::WrongFormat(
                        "substitute indices are not a permutation of the child's".into(),
                    ));
                }
                TensorKind::Substitute {
                    tensor: Box::new(tensor),
                }
            }
            // Forward compatibility: keep the header, drop the payload.
            _ => TensorKind::Zero,
        };

        Ok(Tensor::build(name, printable, indices, kind))
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::new();
        // Writing into a Vec cannot fail.
        let _ = self.write_to(&mut bytes);
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> TensorResult<Tensor> {
        let mut reader = bytes;
        Tensor::read_from(&mut reader)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::{Index, IndexRange};

    fn named(names: &[&str]) -> Indices {
        names
            .iter()
            .map(|n| Index::named(*n, IndexRange::space()))
            .collect()
    }

    fn roundtrip(tensor: &Tensor) -> Tensor {
        Tensor::from_bytes(&tensor.to_bytes()).unwrap()
    }

    #[test]
    fn test_roundtrip_atoms() {
        for tensor in [
            Tensor::zero(),
            Tensor::one(),
            Tensor::delta(named(&["a", "b"])),
            Tensor::epsilon(named(&["a", "b", "c"])),
            Tensor::gamma_minkowskian(0),
            Tensor::epsilon_gamma(1, 1, named(&["a", "b", "c", "d", "e"])),
        ] {
            assert_eq!(roundtrip(&tensor), tensor);
        }
    }

    #[test]
    fn test_roundtrip_compound() {
        let gamma = Tensor::gamma(named(&["a", "b"]));
        let eps = Tensor::epsilon(named(&["c", "d", "e"]));
        let sum = Tensor::add(&gamma, &Tensor::gamma(named(&["b", "a"]))).unwrap();
        let scaled = sum.scale(Scalar::variable("e", 1));
        let product = Tensor::mul(&scaled, &eps).unwrap();

        assert_eq!(roundtrip(&product), product);
    }

    #[test]
    fn test_roundtrip_substitute() {
        let eps = Tensor::epsilon(named(&["a", "b", "c"]));
        let substituted = Tensor::substitute(&eps, &named(&["c", "a", "b"])).unwrap();
        assert_eq!(roundtrip(&substituted), substituted);
    }

    #[test]
    fn test_roundtrip_scalars() {
        for scalar in [
            Scalar::fraction(-3, 7),
            Scalar::variable("e", 42),
            Scalar::integer(2) * Scalar::variable("e", 1) + Scalar::fraction(1, 2),
        ] {
            assert_eq!(Scalar::from_bytes(&scalar.to_bytes()).unwrap(), scalar);
        }
    }

    #[test]
    fn test_truncated_stream_is_wrong_format() {
        let bytes = Tensor::epsilon(named(&["a", "b", "c"])).to_bytes();
        assert!(matches!(
            Tensor::from_bytes(&bytes[..bytes.len() - 2]),
            Err(TensorError::WrongFormat(_))
        ));
    }

    #[test]
    fn test_unknown_tag_degrades_to_placeholder() {
        let tensor = Tensor::epsilon(named(&["a", "b", "c"]));
        let mut bytes = tensor.to_bytes();

        // The kind tag sits at the end of the record for payload-free
        // atoms; overwrite it with an unassigned value.
        let length = bytes.len();
        bytes[length - 4..].copy_from_slice(&9999u32.to_le_bytes());

        let placeholder = Tensor::from_bytes(&bytes).unwrap();
        assert!(placeholder.is_zero_tensor());
        assert_eq!(placeholder.name(), "epsilon");
        assert_eq!(placeholder.indices().len(), 3);
    }

    #[test]
    fn test_bad_payload_is_wrong_format() {
        // A delta with three indices is not a valid record.
        let mut bytes = Vec::new();
        write_string(&mut bytes, "delta").unwrap();
        write_string(&mut bytes, "\\delta").unwrap();
        write_indices(&mut bytes, &named(&["a", "b", "c"])).unwrap();
        write_u32(&mut bytes, TAG_DELTA).unwrap();

        assert!(matches!(
            Tensor::from_bytes(&bytes),
            Err(TensorError::WrongFormat(_))
        ));
    }
}
