//! Typed reads for element layouts only known at run time.
//!
//! The safe reader needs a static Rust type per element. Fixed-length strings
//! of any width and compound records are read here into plain byte buffers
//! laid out by a [`TypeDescriptor`], then decoded field by field.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use hdf5::types::{FloatSize, IntSize, TypeDescriptor, VarLenAscii, VarLenUnicode};
use hdf5::{Attribute, Dataset, Datatype};
use hdf5_sys::h5a::H5Aread;
use hdf5_sys::h5d::H5Dread;
use hdf5_sys::h5p::H5P_DEFAULT;
use hdf5_sys::h5s::H5S_ALL;

use super::Values;

fn has_var_len(layout: &TypeDescriptor) -> bool {
    match layout {
        TypeDescriptor::VarLenArray(_)
        | TypeDescriptor::VarLenAscii
        | TypeDescriptor::VarLenUnicode
        | TypeDescriptor::Reference(_) => true,
        TypeDescriptor::FixedArray(inner, _) => has_var_len(inner),
        TypeDescriptor::Compound(compound) => compound.fields.iter().any(|f| has_var_len(&f.ty)),
        _ => false,
    }
}

/// Memory type and zeroed buffer for `count` elements of `layout`.
fn buffer_for(layout: &TypeDescriptor, count: usize) -> Result<(Datatype, Vec<u8>)> {
    if has_var_len(layout) {
        return Err(eyre!("variable-length members are not supported in {}", layout));
    }
    let mem_type = Datatype::from_descriptor(layout)?;
    Ok((mem_type, vec![0u8; count * layout.size()]))
}

/// Read every element of `dataset`, converted to `layout`.
pub(super) fn dataset_bytes(dataset: &Dataset, layout: &TypeDescriptor) -> Result<Vec<u8>> {
    let (mem_type, mut buf) = buffer_for(layout, dataset.size())?;
    // SAFETY: the buffer holds `size()` elements of the fixed-size memory type,
    // and both ids stay open for the duration of the call.
    let status = hdf5::sync::sync(|| unsafe {
        H5Dread(
            dataset.id(),
            mem_type.id(),
            H5S_ALL,
            H5S_ALL,
            H5P_DEFAULT,
            buf.as_mut_ptr().cast(),
        )
    });
    if status < 0 {
        return Err(eyre!("cannot read dataset '{}' as {}", dataset.name(), layout));
    }
    Ok(buf)
}

/// Read every element of `attr`, converted to `layout`.
fn attr_bytes(attr: &Attribute, layout: &TypeDescriptor) -> Result<Vec<u8>> {
    let (mem_type, mut buf) = buffer_for(layout, attr.size())?;
    // SAFETY: as for `dataset_bytes`.
    let status =
        hdf5::sync::sync(|| unsafe { H5Aread(attr.id(), mem_type.id(), buf.as_mut_ptr().cast()) });
    if status < 0 {
        return Err(eyre!("cannot read attribute '{}' as {}", attr.name(), layout));
    }
    Ok(buf)
}

/// Text content of a string attribute, as stored.
pub(super) fn attr_text(attr: &Attribute) -> Result<Vec<u8>> {
    let bytes = match attr.dtype()?.to_descriptor()? {
        TypeDescriptor::VarLenAscii => attr.read_scalar::<VarLenAscii>()?.as_bytes().to_vec(),
        TypeDescriptor::VarLenUnicode => attr.read_scalar::<VarLenUnicode>()?.as_bytes().to_vec(),
        layout @ (TypeDescriptor::FixedAscii(_) | TypeDescriptor::FixedUnicode(_)) => {
            let mut bytes = attr_bytes(attr, &layout)?;
            while bytes.last() == Some(&0) {
                bytes.pop();
            }
            bytes
        }
        other => return Err(eyre!("attribute '{}' is not a string ({})", attr.name(), other)),
    };
    Ok(bytes)
}

/// Split a buffer of `width`-byte fixed strings. Each value ends at its first NUL
/// and loses trailing space padding.
pub(super) fn fixed_strings(bytes: &[u8], width: usize) -> Vec<String> {
    if width == 0 {
        return Vec::new();
    }
    bytes.chunks_exact(width).map(fixed_string).collect()
}

fn fixed_string(slot: &[u8]) -> String {
    let end = slot.iter().position(|&b| b == 0).unwrap_or(slot.len());
    let text = String::from_utf8_lossy(&slot[..end]);
    text.trim_end_matches(' ').to_string()
}

/// One scalar field of a record, decoded from native-endian bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Scalar {
    Float(usize),
    Int(usize),
    UInt(usize),
    Bool,
    Ascii(usize),
    Utf8(usize),
}

impl Scalar {
    pub(super) fn from_descriptor(layout: &TypeDescriptor) -> Result<Self> {
        let scalar = match layout {
            TypeDescriptor::Float(_) => Self::Float(layout.size()),
            TypeDescriptor::Integer(_) => Self::Int(layout.size()),
            TypeDescriptor::Unsigned(_) => Self::UInt(layout.size()),
            TypeDescriptor::Boolean => Self::Bool,
            TypeDescriptor::Enum(e) => Self::from_descriptor(&e.base_type())?,
            TypeDescriptor::FixedAscii(n) => Self::Ascii(*n),
            TypeDescriptor::FixedUnicode(n) => Self::Utf8(*n),
            other => return Err(eyre!("unsupported field type {}", other)),
        };
        Ok(scalar)
    }

    /// Memory layout this scalar is read as.
    pub(super) fn layout(&self) -> TypeDescriptor {
        fn int_size(size: usize) -> IntSize {
            match size {
                1 => IntSize::U1,
                2 => IntSize::U2,
                4 => IntSize::U4,
                _ => IntSize::U8,
            }
        }
        match *self {
            Self::Float(4) => TypeDescriptor::Float(FloatSize::U4),
            Self::Float(_) => TypeDescriptor::Float(FloatSize::U8),
            Self::Int(n) => TypeDescriptor::Integer(int_size(n)),
            Self::UInt(n) => TypeDescriptor::Unsigned(int_size(n)),
            Self::Bool => TypeDescriptor::Boolean,
            Self::Ascii(n) => TypeDescriptor::FixedAscii(n),
            Self::Utf8(n) => TypeDescriptor::FixedUnicode(n),
        }
    }

    pub(super) fn size(&self) -> usize {
        self.layout().size()
    }

    /// Decode this field at `offset` of every `stride`-byte record in `bytes`.
    pub(super) fn column(&self, bytes: &[u8], stride: usize, offset: usize) -> Values {
        let size = self.size();
        let slots = bytes
            .chunks_exact(stride)
            .map(move |record| &record[offset..offset + size]);
        match *self {
            Self::Float(4) => {
                Values::Float(slots.map(|s| f32::from_ne_bytes(array(s)) as f64).collect())
            }
            Self::Float(_) => Values::Float(slots.map(|s| f64::from_ne_bytes(array(s))).collect()),
            Self::Int(_) => Values::Int(slots.map(signed).collect()),
            Self::UInt(_) => Values::UInt(slots.map(unsigned).collect()),
            Self::Bool => Values::Bool(slots.map(|s| s[0] != 0).collect()),
            Self::Ascii(_) | Self::Utf8(_) => Values::Str(slots.map(fixed_string).collect()),
        }
    }
}

fn array<const N: usize>(slot: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&slot[..N]);
    out
}

fn signed(slot: &[u8]) -> i64 {
    match slot.len() {
        1 => i8::from_ne_bytes(array(slot)) as i64,
        2 => i16::from_ne_bytes(array(slot)) as i64,
        4 => i32::from_ne_bytes(array(slot)) as i64,
        _ => i64::from_ne_bytes(array(slot)),
    }
}

fn unsigned(slot: &[u8]) -> u64 {
    match slot.len() {
        1 => slot[0] as u64,
        2 => u16::from_ne_bytes(array(slot)) as u64,
        4 => u32::from_ne_bytes(array(slot)) as u64,
        _ => u64::from_ne_bytes(array(slot)),
    }
}
