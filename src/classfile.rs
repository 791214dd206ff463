//! Decoder for the JVM class file format.
//!
//! Only declarations are decoded: the constant pool, class header, and the
//! field and method tables. Attributes (code included) are skipped by length.
//! There is no I/O in this module.

use thiserror::Error;

pub const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_PUBLIC: u16 = 0x0001;
pub const ACC_PRIVATE: u16 = 0x0002;
pub const ACC_PROTECTED: u16 = 0x0004;
pub const ACC_STATIC: u16 = 0x0008;
pub const ACC_FINAL: u16 = 0x0010;
pub const ACC_SYNCHRONIZED: u16 = 0x0020;
pub const ACC_NATIVE: u16 = 0x0100;
pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_STRICT: u16 = 0x0800;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_ANNOTATION: u16 = 0x2000;
pub const ACC_ENUM: u16 = 0x4000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unexpected end of class data at offset {offset} (wanted {wanted} bytes)")]
    UnexpectedEof { offset: usize, wanted: usize },

    #[error("bad magic 0x{0:08X}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownTag { tag: u8, index: u16 },

    #[error("constant pool index {0} does not point at the expected entry")]
    BadIndex(u16),
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Utf8(String),
    Integer(i32),
    Float(f32),
    Long(i64),
    Double(f64),
    Class { name_index: u16 },
    String { string_index: u16 },
    FieldRef { class_index: u16, name_and_type_index: u16 },
    MethodRef { class_index: u16, name_and_type_index: u16 },
    InterfaceMethodRef { class_index: u16, name_and_type_index: u16 },
    NameAndType { name_index: u16, descriptor_index: u16 },
    MethodHandle { kind: u8, reference_index: u16 },
    MethodType { descriptor_index: u16 },
    Dynamic { bootstrap_index: u16, name_and_type_index: u16 },
    InvokeDynamic { bootstrap_index: u16, name_and_type_index: u16 },
    Module { name_index: u16 },
    Package { name_index: u16 },
    /// Second slot of a long or double, and slot 0.
    Unusable,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConstantPool {
    entries: Vec<Constant>,
}

impl ConstantPool {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.len() <= 1
    }

    pub fn get(&self, index: u16) -> Option<&Constant> {
        self.entries.get(index as usize)
    }

    pub fn utf8(&self, index: u16) -> Result<&str, DecodeError> {
        match self.get(index) {
            Some(Constant::Utf8(s)) => Ok(s),
            _ => Err(DecodeError::BadIndex(index)),
        }
    }

    /// Class reference resolved to its dotted name.
    pub fn class_name(&self, index: u16) -> Result<String, DecodeError> {
        match self.get(index) {
            Some(Constant::Class { name_index }) => Ok(self.utf8(*name_index)?.replace('/', ".")),
            _ => Err(DecodeError::BadIndex(index)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberInfo {
    pub access_flags: u16,
    pub name: String,
    pub descriptor: String,
}

impl MemberInfo {
    pub fn is_synthetic(&self) -> bool {
        self.access_flags & ACC_SYNTHETIC != 0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassFile {
    pub minor_version: u16,
    pub major_version: u16,
    pub constant_pool: ConstantPool,
    pub access_flags: u16,
    pub this_class: String,
    pub super_class: Option<String>,
    pub interfaces: Vec<String>,
    pub fields: Vec<MemberInfo>,
    pub methods: Vec<MemberInfo>,
}

impl ClassFile {
    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    pub fn is_annotation(&self) -> bool {
        self.access_flags & ACC_ANNOTATION != 0
    }

    pub fn is_enum(&self) -> bool {
        self.access_flags & ACC_ENUM != 0
    }

    pub fn package_name(&self) -> &str {
        self.this_class
            .rsplit_once('.')
            .map(|(pkg, _)| pkg)
            .unwrap_or("")
    }

    pub fn simple_name(&self) -> &str {
        self.this_class
            .rsplit_once('.')
            .map(|(_, name)| name)
            .unwrap_or(&self.this_class)
    }
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], DecodeError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.data.len())
            .ok_or(DecodeError::UnexpectedEof {
                offset: self.pos,
                wanted: n,
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, DecodeError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        let hi = self.u32()? as u64;
        let lo = self.u32()? as u64;
        Ok((hi << 32) | lo)
    }
}

pub fn parse_class_file(data: &[u8]) -> Result<ClassFile, DecodeError> {
    let mut r = Reader::new(data);
    let magic = r.u32()?;
    if magic != MAGIC {
        return Err(DecodeError::BadMagic(magic));
    }
    let minor_version = r.u16()?;
    let major_version = r.u16()?;
    let constant_pool = parse_constant_pool(&mut r)?;

    let access_flags = r.u16()?;
    let this_class = constant_pool.class_name(r.u16()?)?;
    let super_index = r.u16()?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(constant_pool.class_name(super_index)?)
    };

    let interface_count = r.u16()?;
    let mut interfaces = Vec::with_capacity(interface_count as usize);
    for _ in 0..interface_count {
        interfaces.push(constant_pool.class_name(r.u16()?)?);
    }

    let fields = parse_members(&mut r, &constant_pool)?;
    let methods = parse_members(&mut r, &constant_pool)?;
    skip_attributes(&mut r)?;

    Ok(ClassFile {
        minor_version,
        major_version,
        constant_pool,
        access_flags,
        this_class,
        super_class,
        interfaces,
        fields,
        methods,
    })
}

fn parse_constant_pool(r: &mut Reader<'_>) -> Result<ConstantPool, DecodeError> {
    let count = r.u16()?;
    let mut entries = Vec::with_capacity(count as usize);
    entries.push(Constant::Unusable);

    let mut index = 1u32;
    while index < u32::from(count) {
        let tag = r.u8()?;
        let constant = match tag {
            1 => {
                let len = r.u16()? as usize;
                Constant::Utf8(decode_modified_utf8(r.take(len)?))
            }
            3 => Constant::Integer(r.u32()? as i32),
            4 => Constant::Float(f32::from_bits(r.u32()?)),
            5 => Constant::Long(r.u64()? as i64),
            6 => Constant::Double(f64::from_bits(r.u64()?)),
            7 => Constant::Class {
                name_index: r.u16()?,
            },
            8 => Constant::String {
                string_index: r.u16()?,
            },
            9 => Constant::FieldRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            10 => Constant::MethodRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            11 => Constant::InterfaceMethodRef {
                class_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            12 => Constant::NameAndType {
                name_index: r.u16()?,
                descriptor_index: r.u16()?,
            },
            15 => Constant::MethodHandle {
                kind: r.u8()?,
                reference_index: r.u16()?,
            },
            16 => Constant::MethodType {
                descriptor_index: r.u16()?,
            },
            17 => Constant::Dynamic {
                bootstrap_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            18 => Constant::InvokeDynamic {
                bootstrap_index: r.u16()?,
                name_and_type_index: r.u16()?,
            },
            19 => Constant::Module {
                name_index: r.u16()?,
            },
            20 => Constant::Package {
                name_index: r.u16()?,
            },
            tag => {
                return Err(DecodeError::UnknownTag {
                    tag,
                    index: index as u16,
                });
            }
        };

        let wide = matches!(constant, Constant::Long(_) | Constant::Double(_));
        entries.push(constant);
        index += 1;
        if wide {
            entries.push(Constant::Unusable);
            index += 1;
        }
    }

    Ok(ConstantPool { entries })
}

fn parse_members(r: &mut Reader<'_>, pool: &ConstantPool) -> Result<Vec<MemberInfo>, DecodeError> {
    let count = r.u16()?;
    let mut members = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let access_flags = r.u16()?;
        let name = pool.utf8(r.u16()?)?.to_string();
        let descriptor = pool.utf8(r.u16()?)?.to_string();
        skip_attributes(r)?;
        members.push(MemberInfo {
            access_flags,
            name,
            descriptor,
        });
    }
    Ok(members)
}

fn skip_attributes(r: &mut Reader<'_>) -> Result<(), DecodeError> {
    let count = r.u16()?;
    for _ in 0..count {
        let _name_index = r.u16()?;
        let len = r.u32()? as usize;
        r.take(len)?;
    }
    Ok(())
}

/// Class files store strings as modified UTF-8: NUL is two bytes and
/// supplementary characters are surrogate pairs. Anything that does not
/// decode cleanly is replaced rather than rejected.
fn decode_modified_utf8(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b & 0x80 == 0 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 && i + 1 < bytes.len() {
            units.push((((b & 0x1F) as u16) << 6) | (bytes[i + 1] & 0x3F) as u16);
            i += 2;
        } else if b & 0xF0 == 0xE0 && i + 2 < bytes.len() {
            units.push(
                (((b & 0x0F) as u16) << 12)
                    | (((bytes[i + 1] & 0x3F) as u16) << 6)
                    | (bytes[i + 2] & 0x3F) as u16,
            );
            i += 3;
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}
