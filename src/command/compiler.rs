//! Compiles `<Command>` descriptor documents into [`CommandDescriptor`]s.
//!
//! ```xml
//! <Command timeout="30" type="Text|StoredProcedure|TableDirect">
//!   <Parameters>
//!     <Parameter name="@id" type="BigInt" direction="Input" isNullable="false"
//!                size="N" precision="N" scale="N" value="default"/>
//!   </Parameters>
//!   <CommandText><![CDATA[ SELECT ... WHERE id = @id ]]></CommandText>
//! </Command>
//! ```

use crate::coerce::{coerce_lenient, RawValue};
use crate::command::types::{
    CommandDescriptor, CommandKind, DeclaredType, Direction, ParameterDescriptor,
    DEFAULT_TIMEOUT_SECONDS,
};
use crate::error::DescriptorError;
use roxmltree::{Document, Node};
use std::collections::HashSet;

/// Accepted root tags. `SqlCommand` is the tag used by older descriptor files.
const ROOT_TAGS: &[&str] = &["Command", "SqlCommand"];

/// Declared type assumed when a parameter has no `type` attribute.
const DEFAULT_DECLARED_TYPE: DeclaredType = DeclaredType::NVarChar;

pub fn compile(source: &str) -> Result<CommandDescriptor, DescriptorError> {
    let doc = Document::parse(source).map_err(|e| DescriptorError::Malformed(e.to_string()))?;
    let root = doc.root_element();
    let root_tag = root.tag_name().name();
    if !ROOT_TAGS.contains(&root_tag) {
        return Err(DescriptorError::Malformed(format!(
            "root element must be <Command>, found <{}>",
            root_tag
        )));
    }

    let timeout = coerce_lenient(root.attribute("timeout"), 0i32);
    let timeout_seconds = u32::try_from(timeout)
        .ok()
        .filter(|t| *t > 0)
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);
    let kind = root
        .attribute("type")
        .and_then(CommandKind::from_token)
        .unwrap_or_default();

    let text = child(root, "CommandText").map(element_text).unwrap_or_default();
    let text = match kind {
        CommandKind::Text => text,
        _ => text.trim().to_string(),
    };

    let mut parameters = Vec::new();
    let mut seen = HashSet::new();
    if let Some(block) = child(root, "Parameters") {
        for element in block.children().filter(|n| n.has_tag_name("Parameter")) {
            let parameter = compile_parameter(element)?;
            if !seen.insert(parameter.key()) {
                return Err(DescriptorError::Malformed(format!(
                    "duplicate parameter '{}'",
                    parameter.name
                )));
            }
            parameters.push(parameter);
        }
    }

    Ok(CommandDescriptor {
        timeout_seconds,
        kind,
        text,
        parameters,
    })
}

fn compile_parameter(element: Node<'_, '_>) -> Result<ParameterDescriptor, DescriptorError> {
    let name = element
        .attribute("name")
        .map(str::trim)
        .filter(|n| !n.trim_start_matches('@').is_empty())
        .ok_or_else(|| DescriptorError::Malformed("<Parameter> requires a name".into()))?
        .to_string();

    let declared_type = match element.attribute("type") {
        None => DEFAULT_DECLARED_TYPE,
        Some(token) => DeclaredType::from_token(token).ok_or_else(|| DescriptorError::UnresolvedType {
            parameter: name.clone(),
            token: token.to_string(),
        })?,
    };
    let direction = element
        .attribute("direction")
        .and_then(Direction::from_token)
        .unwrap_or_default();
    let is_nullable = coerce_lenient(element.attribute("isNullable"), true);
    let size = Some(coerce_lenient(element.attribute("size"), 0i32)).filter(|s| *s > 0);
    let precision = Some(coerce_lenient(element.attribute("precision"), 0u8)).filter(|p| *p > 0);
    let scale = Some(coerce_lenient(element.attribute("scale"), 0u8)).filter(|s| *s > 0);
    let default_value = element
        .attribute("value")
        .and_then(|v| declared_type.target().coerce(&RawValue::from(v), None));

    Ok(ParameterDescriptor {
        name,
        declared_type,
        direction,
        is_nullable,
        size,
        precision,
        scale,
        default_value,
    })
}

fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|n| n.has_tag_name(tag))
}

/// Text and CDATA content of an element, verbatim.
fn element_text(node: Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::types::{CoercionTarget, SqlValue};

    const WIDGETS: &str = r#"<Command timeout="45">
  <Parameters>
    <Parameter name="@id" type="BigInt" isNullable="false"/>
    <Parameter name="name" type="nvarchar" size="50"/>
    <Parameter name="@price" type="Decimal" precision="10" scale="2" direction="InputOutput"/>
    <Parameter name="@active" type="Bit" value="1"/>
  </Parameters>
  <CommandText><![CDATA[
    SELECT json_agg(w)::text FROM widgets w WHERE w.id = @id
  ]]></CommandText>
</Command>"#;

    #[test]
    fn compiles_parameters_and_attributes() {
        let cmd = compile(WIDGETS).unwrap();
        assert_eq!(cmd.timeout_seconds, 45);
        assert_eq!(cmd.kind, CommandKind::Text);
        assert_eq!(cmd.parameters.len(), 4);

        let id = &cmd.parameters[0];
        assert_eq!(id.name, "@id");
        assert_eq!(id.declared_type, DeclaredType::BigInt);
        assert_eq!(id.target(), CoercionTarget::BigInt);
        assert!(!id.is_nullable);
        assert_eq!(id.direction, Direction::Input);

        let name = &cmd.parameters[1];
        assert_eq!(name.declared_type, DeclaredType::NVarChar);
        assert!(name.is_nullable);
        assert_eq!(name.size, Some(50));

        let price = &cmd.parameters[2];
        assert_eq!(price.precision, Some(10));
        assert_eq!(price.scale, Some(2));
        assert_eq!(price.direction, Direction::InputOutput);

        assert_eq!(cmd.parameters[3].default_value, Some(SqlValue::Bit(true)));
    }

    #[test]
    fn text_command_keeps_whitespace() {
        let cmd = compile(WIDGETS).unwrap();
        assert!(cmd.text.starts_with("\n    SELECT"));
        assert!(cmd.text.ends_with("= @id\n  "));
    }

    #[test]
    fn stored_procedure_text_is_trimmed() {
        let cmd = compile(
            r#"<SqlCommand type="storedprocedure"><CommandText>
                 reporting.list_widgets
               </CommandText></SqlCommand>"#,
        )
        .unwrap();
        assert_eq!(cmd.kind, CommandKind::StoredProcedure);
        assert_eq!(cmd.text, "reporting.list_widgets");
        assert!(cmd.parameters.is_empty());
    }

    #[test]
    fn non_positive_or_garbage_timeout_defaults() {
        for attr in ["timeout=\"-5\"", "timeout=\"0\"", "timeout=\"soon\"", ""] {
            let cmd = compile(&format!("<Command {}><CommandText>SELECT 1</CommandText></Command>", attr)).unwrap();
            assert_eq!(cmd.timeout_seconds, DEFAULT_TIMEOUT_SECONDS, "{}", attr);
        }
    }

    #[test]
    fn unknown_command_type_defaults_to_text() {
        let cmd = compile(r#"<Command type="Batch"><CommandText> x </CommandText></Command>"#).unwrap();
        assert_eq!(cmd.kind, CommandKind::Text);
        assert_eq!(cmd.text, " x ");
    }

    #[test]
    fn missing_type_attribute_defaults_to_nvarchar() {
        let cmd = compile(r#"<Command><Parameters><Parameter name="q"/></Parameters></Command>"#).unwrap();
        assert_eq!(cmd.parameters[0].declared_type, DeclaredType::NVarChar);
        assert_eq!(cmd.text, "");
    }

    #[test]
    fn rejects_wrong_root() {
        let err = compile("<Query><CommandText>SELECT 1</CommandText></Query>").unwrap_err();
        assert!(matches!(err, DescriptorError::Malformed(_)));
    }

    #[test]
    fn rejects_unparseable_document() {
        assert!(matches!(compile("<Command>"), Err(DescriptorError::Malformed(_))));
    }

    #[test]
    fn rejects_unmapped_declared_types() {
        for token in ["Binary", "VarBinary", "Image", "Timestamp", "Variant", "Udt", "Structured", "jsonb"] {
            let src = format!(r#"<Command><Parameters><Parameter name="p" type="{}"/></Parameters></Command>"#, token);
            match compile(&src) {
                Err(DescriptorError::UnresolvedType { parameter, token: t }) => {
                    assert_eq!(parameter, "p");
                    assert_eq!(t, token);
                }
                other => panic!("expected unresolved type for {}, got {:?}", token, other),
            }
        }
    }

    #[test]
    fn rejects_nameless_and_duplicate_parameters() {
        assert!(compile(r#"<Command><Parameters><Parameter type="Int"/></Parameters></Command>"#).is_err());
        let dup = r#"<Command><Parameters>
            <Parameter name="@Id" type="Int"/><Parameter name="id" type="Int"/>
        </Parameters></Command>"#;
        assert!(matches!(compile(dup), Err(DescriptorError::Malformed(_))));
    }

    #[test]
    fn non_positive_size_precision_scale_are_ignored() {
        let cmd = compile(
            r#"<Command><Parameters><Parameter name="p" type="Decimal" size="-1" precision="0" scale="x"/></Parameters></Command>"#,
        )
        .unwrap();
        let p = &cmd.parameters[0];
        assert_eq!((p.size, p.precision, p.scale), (None, None, None));
    }
}
