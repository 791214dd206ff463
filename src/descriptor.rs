//! JVM type descriptors and access-flag keywords.

use crate::classfile::{
    ACC_ABSTRACT, ACC_FINAL, ACC_NATIVE, ACC_PRIVATE, ACC_PROTECTED, ACC_PUBLIC, ACC_STATIC,
    ACC_STRICT, ACC_SYNCHRONIZED,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSignature {
    pub parameters: Vec<String>,
    pub return_type: String,
}

/// Parses one field descriptor such as `I`, `[J` or `Ljava/util/List;`.
/// Returns `None` when the text is not exactly one descriptor.
pub fn parse_field_descriptor(descriptor: &str) -> Option<String> {
    let (ty, rest) = parse_type(descriptor)?;
    rest.is_empty().then_some(ty)
}

/// Parses `(params)return`.
pub fn parse_method_descriptor(descriptor: &str) -> Option<MethodSignature> {
    let inner = descriptor.strip_prefix('(')?;
    let (params, ret) = inner.split_once(')')?;

    let mut parameters = Vec::new();
    let mut rest = params;
    while !rest.is_empty() {
        let (ty, tail) = parse_type(rest)?;
        parameters.push(ty);
        rest = tail;
    }

    let return_type = parse_field_descriptor(ret)?;
    Some(MethodSignature {
        parameters,
        return_type,
    })
}

/// Consumes one type from the front of `s`, returning it and the remainder.
fn parse_type(s: &str) -> Option<(String, &str)> {
    let first = s.chars().next()?;
    let rest = &s[first.len_utf8()..];
    let primitive = match first {
        'B' => "byte",
        'C' => "char",
        'D' => "double",
        'F' => "float",
        'I' => "int",
        'J' => "long",
        'S' => "short",
        'Z' => "boolean",
        'V' => "void",
        'L' => {
            let (name, tail) = rest.split_once(';')?;
            if name.is_empty() {
                return None;
            }
            return Some((name.replace('/', "."), tail));
        }
        '[' => {
            let (element, tail) = parse_type(rest)?;
            return Some((format!("{element}[]"), tail));
        }
        _ => return None,
    };
    Some((primitive.to_string(), rest))
}

/// Modifier keywords for an access-flag mask: one visibility keyword
/// (public, then private, then protected; public when none is set) followed
/// by static, final, synchronized, native, abstract, strictfp.
pub fn decode_modifiers(flags: u16) -> Vec<&'static str> {
    let mut out = Vec::new();
    if flags & ACC_PUBLIC != 0 {
        out.push("public");
    } else if flags & ACC_PRIVATE != 0 {
        out.push("private");
    } else if flags & ACC_PROTECTED != 0 {
        out.push("protected");
    } else {
        out.push("public");
    }

    for (bit, keyword) in [
        (ACC_STATIC, "static"),
        (ACC_FINAL, "final"),
        (ACC_SYNCHRONIZED, "synchronized"),
        (ACC_NATIVE, "native"),
        (ACC_ABSTRACT, "abstract"),
        (ACC_STRICT, "strictfp"),
    ] {
        if flags & bit != 0 {
            out.push(keyword);
        }
    }
    out
}
