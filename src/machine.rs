//! Machine model: primitive widths, alignment and aggregate layout.

use crate::types::{ArrayLength, CompositeKind, CompositeType, FloatKind, IntRank, IntType, Type};

/// Sizes (in bytes) and alignments of the primitive types of a target.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct MachineModel {
    pub name: &'static str,
    pub size_of_short: u64,
    pub size_of_int: u64,
    pub size_of_long: u64,
    pub size_of_long_long: u64,
    pub size_of_int128: u64,
    pub size_of_float: u64,
    pub size_of_double: u64,
    pub size_of_long_double: u64,
    pub size_of_float128: u64,
    pub size_of_pointer: u64,
    pub size_of_bool: u64,
    /// Whether plain `char` is signed.
    pub char_signed: bool,
    pub align_of_long_long: u64,
    pub align_of_double: u64,
    pub align_of_long_double: u64,
}

impl MachineModel {
    pub const fn linux32() -> Self {
        Self {
            name: "linux32",
            size_of_short: 2,
            size_of_int: 4,
            size_of_long: 4,
            size_of_long_long: 8,
            size_of_int128: 16,
            size_of_float: 4,
            size_of_double: 8,
            size_of_long_double: 12,
            size_of_float128: 16,
            size_of_pointer: 4,
            size_of_bool: 1,
            char_signed: true,
            align_of_long_long: 4,
            align_of_double: 4,
            align_of_long_double: 4,
        }
    }

    pub const fn linux64() -> Self {
        Self {
            name: "linux64",
            size_of_short: 2,
            size_of_int: 4,
            size_of_long: 8,
            size_of_long_long: 8,
            size_of_int128: 16,
            size_of_float: 4,
            size_of_double: 8,
            size_of_long_double: 16,
            size_of_float128: 16,
            size_of_pointer: 8,
            size_of_bool: 1,
            char_signed: true,
            align_of_long_long: 8,
            align_of_double: 8,
            align_of_long_double: 16,
        }
    }

    /// Fixed JVM widths: byte 8, short/char 16, int 32, long 64.
    pub const fn java() -> Self {
        Self {
            name: "java",
            size_of_short: 2,
            size_of_int: 4,
            size_of_long: 8,
            size_of_long_long: 8,
            size_of_int128: 16,
            size_of_float: 4,
            size_of_double: 8,
            size_of_long_double: 8,
            size_of_float128: 16,
            size_of_pointer: 8,
            size_of_bool: 1,
            char_signed: true,
            align_of_long_long: 8,
            align_of_double: 8,
            align_of_long_double: 8,
        }
    }

    pub fn size_of_rank(&self, rank: IntRank) -> u64 {
        match rank {
            IntRank::Char => 1,
            IntRank::Short => self.size_of_short,
            IntRank::Int => self.size_of_int,
            IntRank::Long => self.size_of_long,
            IntRank::LongLong => self.size_of_long_long,
            IntRank::Int128 => self.size_of_int128,
        }
    }

    pub fn size_of_float_kind(&self, kind: FloatKind) -> u64 {
        match kind {
            FloatKind::Float => self.size_of_float,
            FloatKind::Double => self.size_of_double,
            FloatKind::LongDouble => self.size_of_long_double,
            FloatKind::Float128 => self.size_of_float128,
        }
    }

    /// Width in bits of an integer type, honouring bitfields.
    pub fn int_width(&self, it: &IntType) -> u32 {
        match it.bitfield {
            Some(bits) => bits,
            None => (self.size_of_rank(it.rank) * 8) as u32,
        }
    }

    /// Integer view of a type: the representation used when casting to it.
    ///
    /// Enums are `int`, pointers are unsigned words.
    pub fn integer_view(&self, ty: &Type) -> Option<(u32, bool)> {
        match ty {
            Type::Int(it) => Some((self.int_width(it), it.signed)),
            Type::Enum(_) => Some(((self.size_of_int * 8) as u32, true)),
            Type::Pointer(_) => Some(((self.size_of_pointer * 8) as u32, false)),
            _ => None,
        }
    }

    /// Size of a type in bytes, `None` for incomplete or variable-size types.
    pub fn size_of(&self, ty: &Type) -> Option<u64> {
        match ty {
            Type::Void => Some(1),
            Type::Bool => Some(self.size_of_bool),
            Type::Int(it) => Some(self.size_of_rank(it.rank)),
            Type::Float(kind) => Some(self.size_of_float_kind(*kind)),
            Type::Pointer(_) | Type::Function(_) => Some(self.size_of_pointer),
            Type::Enum(_) => Some(self.size_of_int),
            Type::Array { element, length } => match length {
                ArrayLength::Fixed(n) => self.size_of(element)?.checked_mul(*n),
                ArrayLength::Variable(_) | ArrayLength::Unspecified => None,
            },
            Type::Composite(c) => self.size_of_composite(c),
            Type::Reference(_) | Type::JavaArray(_) | Type::Null => Some(self.size_of_pointer),
            Type::Unspecified => None,
        }
    }

    pub fn size_of_in_bits(&self, ty: &Type) -> Option<u64> {
        match ty {
            Type::Int(IntType {
                bitfield: Some(bits),
                ..
            }) => Some(*bits as u64),
            _ => self.size_of(ty)?.checked_mul(8),
        }
    }

    pub fn align_of(&self, ty: &Type) -> Option<u64> {
        match ty {
            Type::Int(it) if it.rank == IntRank::LongLong => Some(self.align_of_long_long),
            Type::Float(FloatKind::Double) => Some(self.align_of_double),
            Type::Float(FloatKind::LongDouble) => Some(self.align_of_long_double),
            Type::Array { element, .. } => self.align_of(element),
            Type::Composite(c) => self.align_of_composite(c),
            other => self.size_of(other),
        }
    }

    fn align_of_composite(&self, c: &CompositeType) -> Option<u64> {
        c.members
            .iter()
            .map(|m| self.align_of(&m.ty))
            .try_fold(1, |acc, a| a.map(|a| acc.max(a)))
    }

    fn size_of_composite(&self, c: &CompositeType) -> Option<u64> {
        let align = self.align_of_composite(c)?;
        let raw = match c.kind {
            CompositeKind::Struct => {
                let mut offset = 0;
                for m in &c.members {
                    offset = round_up(offset, self.align_of(&m.ty)?)?.checked_add(self.size_of(&m.ty)?)?;
                }
                offset
            }
            CompositeKind::Union => c
                .members
                .iter()
                .map(|m| self.size_of(&m.ty))
                .try_fold(0, |acc, s| s.map(|s| acc.max(s)))?,
        };
        round_up(raw, align)
    }

    /// Byte offset of `field` inside `c`.
    ///
    /// Bitfields are laid out as full storage units.
    pub fn field_offset(&self, c: &CompositeType, field: &str) -> Option<u64> {
        if c.kind == CompositeKind::Union {
            return c.member(field).map(|_| 0);
        }
        let mut offset = 0;
        for m in &c.members {
            offset = round_up(offset, self.align_of(&m.ty)?)?;
            if &*m.name == field {
                return Some(offset);
            }
            offset = offset.checked_add(self.size_of(&m.ty)?)?;
        }
        None
    }

    /// Offsets and types of the scalar sub-objects of `ty`, in layout order.
    ///
    /// A scalar yields itself at offset zero. Unions yield their first member only.
    pub fn leaf_offsets(&self, ty: &Type) -> Option<Vec<(u64, Type)>> {
        let mut out = Vec::new();
        self.collect_leaves(ty, 0, &mut out)?;
        Some(out)
    }

    fn collect_leaves(&self, ty: &Type, base: u64, out: &mut Vec<(u64, Type)>) -> Option<()> {
        match ty {
            Type::Composite(c) => {
                let members: &[_] = match c.kind {
                    CompositeKind::Struct => &c.members,
                    CompositeKind::Union => &c.members[..c.members.len().min(1)],
                };
                for m in members {
                    let offset = self.field_offset(c, &m.name)?;
                    self.collect_leaves(&m.ty, base.checked_add(offset)?, out)?;
                }
            }
            Type::Array {
                element,
                length: ArrayLength::Fixed(n),
            } => {
                let size = self.size_of(element)?;
                base.checked_add(size.checked_mul(*n)?)?;
                for i in 0..*n {
                    self.collect_leaves(element, base.checked_add(i.checked_mul(size)?)?, out)?;
                }
            }
            Type::Array { .. } => return None,
            other => out.push((base, other.clone())),
        }
        Some(())
    }
}

impl Default for MachineModel {
    fn default() -> Self {
        MachineModel::linux32()
    }
}

fn round_up(value: u64, align: u64) -> Option<u64> {
    if align <= 1 {
        Some(value)
    } else {
        value.div_ceil(align).checked_mul(align)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::types::Member;

    use test_log::test;

    fn point() -> CompositeType {
        CompositeType {
            kind: CompositeKind::Struct,
            name: "point".into(),
            members: vec![
                Member {
                    name: "tag".into(),
                    ty: Type::schar(),
                },
                Member {
                    name: "x".into(),
                    ty: Type::int(),
                },
                Member {
                    name: "y".into(),
                    ty: Type::double(),
                },
            ],
        }
    }

    #[test]
    fn test_primitive_sizes() {
        let m = MachineModel::linux64();
        assert_eq!(m.size_of(&Type::long()), Some(8));
        assert_eq!(m.size_of(&Type::pointer_to(Type::Void)), Some(8));
        assert_eq!(MachineModel::linux32().size_of(&Type::long()), Some(4));
        assert_eq!(m.size_of(&Type::array_of(Type::short(), 5)), Some(10));
    }

    #[test]
    fn test_struct_layout() {
        let m = MachineModel::linux64();
        let p = point();
        assert_eq!(m.field_offset(&p, "tag"), Some(0));
        assert_eq!(m.field_offset(&p, "x"), Some(4));
        assert_eq!(m.field_offset(&p, "y"), Some(8));
        assert_eq!(m.size_of(&Type::Composite(Arc::new(p))), Some(16));
    }

    #[test]
    fn test_struct_layout_linux32_double_alignment() {
        let m = MachineModel::linux32();
        let p = point();
        assert_eq!(m.field_offset(&p, "y"), Some(8));
        assert_eq!(m.size_of(&Type::Composite(Arc::new(p))), Some(16));
    }

    #[test]
    fn test_leaf_offsets() {
        let m = MachineModel::linux64();
        let ty = Type::array_of(Type::Composite(Arc::new(point())), 2);
        let leaves = m.leaf_offsets(&ty).unwrap();
        let offsets: Vec<u64> = leaves.iter().map(|(o, _)| *o).collect();
        assert_eq!(offsets, vec![0, 4, 8, 16, 20, 24]);
    }

    #[test]
    fn test_bitfield_width() {
        let m = MachineModel::linux64();
        let it = IntType::new(IntRank::Int, false).with_bitfield(5);
        assert_eq!(m.int_width(&it), 5);
        assert_eq!(m.size_of_in_bits(&Type::Int(it)), Some(5));
    }

    #[test]
    fn test_oversized_arrays_have_no_layout() {
        let m = MachineModel::linux64();
        let huge = Type::array_of(Type::int(), u64::MAX / 2);
        assert_eq!(m.size_of(&huge), None);
        assert_eq!(m.size_of_in_bits(&Type::array_of(Type::uchar(), u64::MAX / 4)), None);
        assert_eq!(m.leaf_offsets(&huge), None);
        let nested = Type::array_of(Type::array_of(Type::long(), 1 << 40), 1 << 40);
        assert_eq!(m.size_of(&nested), None);
        let holder = CompositeType {
            kind: CompositeKind::Struct,
            name: "holder".into(),
            members: vec![
                Member {
                    name: "tag".into(),
                    ty: Type::int(),
                },
                Member {
                    name: "data".into(),
                    ty: Type::array_of(Type::uchar(), u64::MAX - 2),
                },
            ],
        };
        assert_eq!(m.size_of(&Type::Composite(Arc::new(holder))), None);
    }
}
