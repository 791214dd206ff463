//! Readable declaration skeletons rebuilt from decoded class files.

use crate::classfile::{ACC_ABSTRACT, ClassFile, MemberInfo};
use crate::descriptor::{decode_modifiers, parse_field_descriptor, parse_method_descriptor};
use crate::extract::{FieldInfo, MethodInfo};
use tracing::debug;

pub const BODY_PLACEHOLDER: &str = "/* compiled code: body unavailable */";

const OBJECT: &str = "java.lang.Object";
const ENUM: &str = "java.lang.Enum";
const ANNOTATION: &str = "java.lang.annotation.Annotation";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Synthesized {
    pub source: String,
    pub methods: Vec<MethodInfo>,
    pub fields: Vec<FieldInfo>,
}

pub fn synthesize(class: &ClassFile) -> Synthesized {
    let fields: Vec<FieldInfo> = class.fields.iter().filter_map(field_info).collect();
    let methods: Vec<MethodInfo> = class
        .methods
        .iter()
        .filter_map(|m| method_info(class, m))
        .collect();

    let mut out = String::new();
    let package = class.package_name();
    if !package.is_empty() {
        out.push_str(&format!("package {package};\n\n"));
    }
    out.push_str(&declaration_line(class));
    out.push_str(" {\n");

    for f in &fields {
        out.push_str(&format!(
            "    {} {} {};\n",
            f.modifiers.join(" "),
            f.field_type,
            f.name
        ));
    }
    if !fields.is_empty() && !methods.is_empty() {
        out.push('\n');
    }

    for (i, m) in methods.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let mut header = m.modifiers.join(" ");
        if let Some(ret) = m.return_type.as_deref() {
            header.push(' ');
            header.push_str(ret);
        }
        out.push_str(&format!(
            "    {header} {}({}) {{\n        {BODY_PLACEHOLDER}\n    }}\n",
            m.name,
            m.parameters.join(", ")
        ));
    }
    out.push_str("}\n");

    Synthesized {
        source: out,
        methods,
        fields,
    }
}

/// `public final class Foo extends Bar implements Baz` and friends.
pub fn declaration_line(class: &ClassFile) -> String {
    let is_interface = class.is_interface();
    let is_enum = class.is_enum();

    let mut parts: Vec<String> = decode_modifiers(class.access_flags)
        .into_iter()
        .filter(|m| !matches!(*m, "synchronized" | "native"))
        .filter(|m| !(is_interface && *m == "abstract"))
        .filter(|m| !(is_enum && *m == "final"))
        .map(str::to_string)
        .collect();

    let keyword = if class.is_annotation() && is_interface {
        "@interface"
    } else if is_interface {
        "interface"
    } else if is_enum {
        "enum"
    } else {
        "class"
    };
    parts.push(keyword.to_string());
    parts.push(source_name(class).to_string());

    if let Some(super_class) = class.super_class.as_deref()
        && !is_interface
        && super_class != OBJECT
        && !(is_enum && super_class == ENUM)
    {
        parts.push(format!("extends {super_class}"));
    }

    let interfaces: Vec<&str> = class
        .interfaces
        .iter()
        .map(String::as_str)
        .filter(|i| !(class.is_annotation() && *i == ANNOTATION))
        .collect();
    if !interfaces.is_empty() {
        let clause = if is_interface { "extends" } else { "implements" };
        parts.push(format!("{clause} {}", interfaces.join(", ")));
    }

    parts.join(" ")
}

fn field_info(member: &MemberInfo) -> Option<FieldInfo> {
    if member.is_synthetic() {
        return None;
    }
    let Some(field_type) = parse_field_descriptor(&member.descriptor) else {
        debug!(field = %member.name, descriptor = %member.descriptor, "unparsable field descriptor");
        return None;
    };
    Some(FieldInfo {
        name: member.name.clone(),
        field_type,
        modifiers: owned(decode_modifiers(member.access_flags)),
    })
}

fn method_info(class: &ClassFile, member: &MemberInfo) -> Option<MethodInfo> {
    if member.is_synthetic() || member.name == "<clinit>" {
        return None;
    }
    let Some(sig) = parse_method_descriptor(&member.descriptor) else {
        debug!(method = %member.name, descriptor = %member.descriptor, "unparsable method descriptor");
        return None;
    };

    let mut flags = member.access_flags;
    if class.is_interface() && flags & ACC_ABSTRACT != 0 {
        flags &= !ACC_ABSTRACT;
    }

    let (name, return_type) = if member.name == "<init>" {
        (source_name(class).to_string(), None)
    } else {
        (member.name.clone(), Some(sig.return_type))
    };

    Some(MethodInfo {
        name,
        return_type,
        parameters: sig.parameters,
        modifiers: owned(decode_modifiers(flags)),
    })
}

/// Name as written in source: `Outer$Inner` -> `Inner`.
fn source_name(class: &ClassFile) -> &str {
    let simple = class.simple_name();
    simple.rsplit('$').next().unwrap_or(simple)
}

fn owned(keywords: Vec<&'static str>) -> Vec<String> {
    keywords.into_iter().map(str::to_string).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classfile::tests::ClassBuilder;
    use crate::classfile::{
        ACC_ANNOTATION, ACC_ENUM, ACC_FINAL, ACC_INTERFACE, ACC_PRIVATE, ACC_PUBLIC, ACC_STATIC,
        ACC_SYNCHRONIZED, ACC_SYNTHETIC, parse_class_file,
    };

    const ACC_SUPER: u16 = 0x0020;

    #[test]
    fn synthesizes_class_skeleton() {
        let bytes = ClassBuilder::new(
            "org/example/Greeter",
            Some("org/example/Base"),
            ACC_PUBLIC | ACC_SUPER,
        )
        .interface("java/io/Serializable")
        .interface("java/lang/Comparable")
        .field(ACC_PRIVATE | ACC_FINAL, "name", "Ljava/lang/String;")
        .field(ACC_STATIC | ACC_SYNTHETIC, "$assertionsDisabled", "Z")
        .method(ACC_PUBLIC, "<init>", "(Ljava/lang/String;)V")
        .method(ACC_STATIC, "<clinit>", "()V")
        .method(ACC_PUBLIC | ACC_SYNCHRONIZED, "greet", "(Ljava/lang/String;I)V")
        .build();
        let class = parse_class_file(&bytes).unwrap();
        let out = synthesize(&class);

        assert!(out.source.starts_with("package org.example;\n\n"));
        assert!(out.source.contains(
            "public class Greeter extends org.example.Base implements java.io.Serializable, java.lang.Comparable {"
        ));
        assert!(out.source.contains("    private final java.lang.String name;\n"));
        assert!(out.source.contains("    public Greeter(java.lang.String) {\n"));
        assert!(
            out.source
                .contains("    public synchronized void greet(java.lang.String, int) {\n")
        );
        assert!(out.source.contains(BODY_PLACEHOLDER));
        assert!(!out.source.contains("clinit"));
        assert!(!out.source.contains("assertionsDisabled"));

        assert_eq!(out.fields.len(), 1);
        assert_eq!(out.methods.len(), 2);
        assert_eq!(out.methods[0].name, "Greeter");
        assert_eq!(out.methods[0].return_type, None);
        assert_eq!(out.methods[1].return_type.as_deref(), Some("void"));
        assert_eq!(out.methods[1].parameters, vec!["java.lang.String", "int"]);
        assert_eq!(out.methods[1].modifiers, vec!["public", "synchronized"]);
    }

    #[test]
    fn object_superclass_is_omitted() {
        let bytes =
            ClassBuilder::new("Plain", Some("java/lang/Object"), ACC_PUBLIC | ACC_SUPER).build();
        let class = parse_class_file(&bytes).unwrap();
        assert_eq!(declaration_line(&class), "public class Plain");
        assert!(synthesize(&class).source.starts_with("public class Plain {"));
    }

    #[test]
    fn interfaces_extend_their_supertypes() {
        let bytes = ClassBuilder::new(
            "com/acme/Repo",
            Some("java/lang/Object"),
            ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT,
        )
        .interface("com/acme/Base")
        .method(ACC_PUBLIC | ACC_ABSTRACT, "find", "(J)Ljava/util/Optional;")
        .build();
        let class = parse_class_file(&bytes).unwrap();
        let out = synthesize(&class);
        assert!(
            out.source
                .contains("public interface Repo extends com.acme.Base {")
        );
        assert_eq!(out.methods[0].modifiers, vec!["public"]);
        assert!(out.source.contains("public java.util.Optional find(long)"));
    }

    #[test]
    fn enums_and_annotations_get_their_keywords() {
        let bytes = ClassBuilder::new(
            "com/acme/Color",
            Some("java/lang/Enum"),
            ACC_PUBLIC | ACC_FINAL | ACC_SUPER | ACC_ENUM,
        )
        .build();
        let class = parse_class_file(&bytes).unwrap();
        assert_eq!(declaration_line(&class), "public enum Color");

        let bytes = ClassBuilder::new(
            "com/acme/Marker",
            Some("java/lang/Object"),
            ACC_PUBLIC | ACC_INTERFACE | ACC_ABSTRACT | ACC_ANNOTATION,
        )
        .interface("java/lang/annotation/Annotation")
        .build();
        let class = parse_class_file(&bytes).unwrap();
        assert_eq!(declaration_line(&class), "public @interface Marker");
    }

    #[test]
    fn nested_classes_use_their_own_name() {
        let bytes = ClassBuilder::new("com/acme/Outer$Inner", Some("java/lang/Object"), ACC_PUBLIC)
            .method(ACC_PUBLIC, "<init>", "()V")
            .build();
        let class = parse_class_file(&bytes).unwrap();
        assert_eq!(declaration_line(&class), "public class Inner");
        let out = synthesize(&class);
        assert!(out.source.contains("public class Inner {"));
        assert!(out.source.contains("    public Inner() {\n"));
        assert_eq!(out.methods[0].name, "Inner");
    }

    #[test]
    fn default_package_has_no_package_line() {
        let bytes = ClassBuilder::new("Top", Some("java/lang/Object"), 0).build();
        let class = parse_class_file(&bytes).unwrap();
        let out = synthesize(&class);
        assert!(out.source.starts_with("public class Top {"));
    }
}
