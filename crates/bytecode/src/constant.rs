use nom::IResult;

use crate::prototype::Prototype;
use crate::{parse_bytes, parse_list_len, uleb128, uleb128_33, uleb128_usize};

/// An entry of the numeric constant pool.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NumericConstant {
    Integer(i32),
    Float(f64),
}

impl NumericConstant {
    pub(crate) fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, (is_float, lo)) = uleb128_33(input)?;
        if is_float {
            let (input, hi) = uleb128(input)?;
            Ok((input, NumericConstant::Float(join_float(lo, hi))))
        } else {
            Ok((input, NumericConstant::Integer(lo as i32)))
        }
    }

    /// Start index stored by the compiler for `TSETM`.
    ///
    /// The index lives in the low 32 bits of a float biased by 2^52.
    pub fn table_start_index(self) -> i64 {
        match self {
            NumericConstant::Integer(value) => value as i64,
            NumericConstant::Float(value) => (value.to_bits() & 0xFFFF_FFFF) as u32 as i32 as i64,
        }
    }
}

/// FFI constants loaded by `KCDATA`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cdata {
    I64(i64),
    U64(u64),
    Complex(f64, f64),
}

/// A key or value inside a table template.
#[derive(Debug, Clone, PartialEq)]
pub enum TableItem {
    Nil,
    False,
    True,
    Integer(i32),
    Float(f64),
    String(Vec<u8>),
}

const KTAB_NIL: usize = 0;
const KTAB_FALSE: usize = 1;
const KTAB_TRUE: usize = 2;
const KTAB_INT: usize = 3;
const KTAB_NUM: usize = 4;
const KTAB_STR: usize = 5;

impl TableItem {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, tag) = uleb128_usize(input)?;
        match tag {
            KTAB_NIL => Ok((input, TableItem::Nil)),
            KTAB_FALSE => Ok((input, TableItem::False)),
            KTAB_TRUE => Ok((input, TableItem::True)),
            KTAB_INT => {
                let (input, value) = uleb128(input)?;
                Ok((input, TableItem::Integer(value as i32)))
            }
            KTAB_NUM => {
                let (input, lo) = uleb128(input)?;
                let (input, hi) = uleb128(input)?;
                Ok((input, TableItem::Float(join_float(lo, hi))))
            }
            _ => {
                let (input, bytes) = parse_bytes(input, tag - KTAB_STR)?;
                Ok((input, TableItem::String(bytes)))
            }
        }
    }
}

/// Constant table duplicated by `TDUP`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableTemplate {
    /// Array part, starting at index 0.
    pub array: Vec<TableItem>,
    /// Hash part in dump order.
    pub hash: Vec<(TableItem, TableItem)>,
}

impl TableTemplate {
    fn parse(input: &[u8]) -> IResult<&[u8], Self> {
        let (input, array_len) = uleb128_usize(input)?;
        let (input, hash_len) = uleb128_usize(input)?;
        let (input, array) = parse_list_len(input, TableItem::parse, array_len)?;
        let (input, hash) = parse_list_len(
            input,
            |i| {
                let (i, key) = TableItem::parse(i)?;
                let (i, value) = TableItem::parse(i)?;
                Ok((i, (key, value)))
            },
            hash_len,
        )?;
        Ok((input, TableTemplate { array, hash }))
    }
}

/// An entry of the complex (garbage collected) constant pool.
#[derive(Debug, Clone, PartialEq)]
pub enum ComplexConstant {
    Prototype(Box<Prototype>),
    Table(TableTemplate),
    Cdata(Cdata),
    String(Vec<u8>),
}

pub(crate) const KGC_CHILD: usize = 0;
const KGC_TAB: usize = 1;
const KGC_I64: usize = 2;
const KGC_U64: usize = 3;
const KGC_COMPLEX: usize = 4;
const KGC_STR: usize = 5;

impl ComplexConstant {
    /// Parse a non-child constant whose tag was already read.
    pub(crate) fn parse_tagged(input: &[u8], tag: usize) -> IResult<&[u8], Self> {
        match tag {
            KGC_TAB => {
                let (input, table) = TableTemplate::parse(input)?;
                Ok((input, ComplexConstant::Table(table)))
            }
            KGC_I64 | KGC_U64 => {
                let (input, lo) = uleb128(input)?;
                let (input, hi) = uleb128(input)?;
                let bits = (hi as u64) << 32 | lo as u64;
                let value = if tag == KGC_I64 {
                    Cdata::I64(bits as i64)
                } else {
                    Cdata::U64(bits)
                };
                Ok((input, ComplexConstant::Cdata(value)))
            }
            KGC_COMPLEX => {
                let (input, re_lo) = uleb128(input)?;
                let (input, re_hi) = uleb128(input)?;
                let (input, im_lo) = uleb128(input)?;
                let (input, im_hi) = uleb128(input)?;
                let value = Cdata::Complex(join_float(re_lo, re_hi), join_float(im_lo, im_hi));
                Ok((input, ComplexConstant::Cdata(value)))
            }
            _ => {
                let (input, bytes) = parse_bytes(input, tag - KGC_STR)?;
                Ok((input, ComplexConstant::String(bytes)))
            }
        }
    }

    pub fn as_string(&self) -> Option<&[u8]> {
        match self {
            ComplexConstant::String(bytes) => Some(bytes),
            _ => None,
        }
    }
}

/// The constant pools of one prototype.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constants {
    /// Complex pool, indexed directly by string/table/function/cdata operands.
    pub complex: Vec<ComplexConstant>,
    pub numeric: Vec<NumericConstant>,
}

fn join_float(lo: u32, hi: u32) -> f64 {
    f64::from_bits((hi as u64) << 32 | lo as u64)
}
