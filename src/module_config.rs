//! FOMOD `ModuleConfig.xml` loader.
//!
//! Turns the XML installer script shipped in `fomod/ModuleConfig.xml` into an
//! [`InstallerDescriptor`]. Mod authors save these files as UTF-8 or UTF-16,
//! with or without a BOM, so decoding is handled before parsing.
//!
//! # Element Mapping
//!
//! | XML                                   | Descriptor |
//! |---------------------------------------|------------|
//! | `moduleName`, `moduleImage@path`      | `module_name`, `module_image` |
//! | `requiredInstallFiles/{file,folder}`  | `required_install_files` |
//! | `installSteps/installStep`            | `steps` (`order` attribute honoured) |
//! | `installStep/visible`                 | `Step::visible` |
//! | `optionalFileGroups/group@type`       | `Group::rule` |
//! | `plugin/conditionFlags/flag`          | `Plugin::condition_flags` |
//! | `plugin/typeDescriptor`               | `Plugin::type_descriptor` |
//! | `conditionalFileInstalls/patterns`    | `conditional_file_installs` |
//!
//! Unknown enum values are rejected. Missing attributes fall back to the
//! FOMOD defaults (`And`, `SelectAny`, `Optional`, `Active`, `Explicit`).

use std::str::FromStr;

use roxmltree::{Document, Node};
use tracing::{debug, warn};

use crate::descriptor::{
    CompositeDependency, ConditionalInstallPattern, FileMapping, FlagSetter, Group,
    InstallerDescriptor, Plugin, Step, TypeDescriptor, TypePattern, MAX_DEPENDENCY_DEPTH,
};
use crate::error::{Result, WizardError};
use crate::types::{DependencyOperator, FileState, PluginType, SelectionRule, SortOrder};

const UTF8_BOM: [u8; 3] = [0xEF, 0xBB, 0xBF];
const UTF16_LE_BOM: [u8; 2] = [0xFF, 0xFE];
const UTF16_BE_BOM: [u8; 2] = [0xFE, 0xFF];

/// Decode raw `ModuleConfig.xml` bytes to text.
///
/// UTF-16 LE/BE requires a BOM; anything else must be UTF-8 (BOM optional).
pub fn decode_module_config(bytes: &[u8]) -> Result<String> {
    if let Some(rest) = bytes.strip_prefix(&UTF16_LE_BOM) {
        decode_utf16(rest, u16::from_le_bytes)
    } else if let Some(rest) = bytes.strip_prefix(&UTF16_BE_BOM) {
        decode_utf16(rest, u16::from_be_bytes)
    } else {
        let rest = bytes.strip_prefix(&UTF8_BOM).unwrap_or(bytes);
        String::from_utf8(rest.to_vec())
            .map_err(|e| WizardError::encoding(format!("module config is not UTF-8: {}", e)))
    }
}

fn decode_utf16(bytes: &[u8], word: fn([u8; 2]) -> u16) -> Result<String> {
    if bytes.len() % 2 != 0 {
        return Err(WizardError::encoding(
            "UTF-16 module config has an odd number of bytes",
        ));
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| word([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units)
        .map_err(|e| WizardError::encoding(format!("invalid UTF-16 module config: {}", e)))
}

/// Parse and validate a `ModuleConfig.xml`.
pub fn parse_module_config(bytes: &[u8]) -> Result<InstallerDescriptor> {
    let text = decode_module_config(bytes)?;
    let doc = Document::parse(&text)?;
    let root = doc.root_element();

    let module_name = child(root, "moduleName").map(text_of).unwrap_or_default();
    let module_image = child(root, "moduleImage")
        .and_then(|n| n.attribute("path"))
        .map(clean_path)
        .unwrap_or_default();

    let required_install_files = child(root, "requiredInstallFiles")
        .map(parse_file_list)
        .unwrap_or_default();

    let steps = match child(root, "installSteps") {
        Some(steps_el) => {
            let mut steps = children(steps_el, "installStep")
                .map(parse_step)
                .collect::<Result<Vec<_>>>()?;
            order_of(steps_el)?.apply(&mut steps, |s| s.name.as_str());
            steps
        }
        None => Vec::new(),
    };

    let conditional_file_installs = match child(root, "conditionalFileInstalls")
        .and_then(|n| child(n, "patterns"))
    {
        Some(patterns) => parse_conditional_installs(patterns)?,
        None => Vec::new(),
    };

    let descriptor = InstallerDescriptor {
        module_name,
        module_image,
        required_install_files,
        steps,
        conditional_file_installs,
    };
    descriptor.validate()?;

    debug!(
        "Parsed module config '{}': {} steps, {} conditional installs",
        descriptor.module_name,
        descriptor.steps.len(),
        descriptor.conditional_file_installs.len()
    );
    Ok(descriptor)
}

// ============================================================================
// Element helpers
// ============================================================================

fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|c| c.is_element() && c.tag_name().name() == name)
}

fn children<'a, 'input>(
    node: Node<'a, 'input>,
    name: &str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(move |c| c.is_element() && c.tag_name().name() == name)
}

fn text_of(node: Node<'_, '_>) -> String {
    node.text().map(str::trim).unwrap_or_default().to_string()
}

/// Backslashes to `/`, outer slashes trimmed. Case is preserved.
fn clean_path(path: &str) -> String {
    path.replace('\\', "/").trim_matches('/').to_string()
}

fn parse_enum<T: FromStr>(value: &str, kind: &'static str) -> Result<T> {
    value
        .parse()
        .map_err(|_| WizardError::unknown(kind, value))
}

fn attr_enum<T: FromStr>(
    node: Node<'_, '_>,
    attr: &str,
    default: &str,
    kind: &'static str,
) -> Result<T> {
    parse_enum(node.attribute(attr).unwrap_or(default), kind)
}

fn order_of(node: Node<'_, '_>) -> Result<SortOrder> {
    attr_enum(node, "order", "Explicit", "order")
}

// ============================================================================
// Files
// ============================================================================

fn parse_file_mapping(node: Node<'_, '_>, is_folder: bool) -> FileMapping {
    let priority = node
        .attribute("priority")
        .and_then(|p| p.trim().parse().ok())
        .unwrap_or(0);
    FileMapping {
        source: clean_path(node.attribute("source").unwrap_or_default()),
        destination: clean_path(node.attribute("destination").unwrap_or_default()),
        priority,
        is_folder,
    }
}

/// `<file>` and `<folder>` children of `parent`, in document order
fn parse_file_list(parent: Node<'_, '_>) -> Vec<FileMapping> {
    parent
        .children()
        .filter(Node::is_element)
        .filter_map(|n| match n.tag_name().name().to_lowercase().as_str() {
            "file" => Some(parse_file_mapping(n, false)),
            "folder" => Some(parse_file_mapping(n, true)),
            _ => None,
        })
        .collect()
}

// ============================================================================
// Dependencies
// ============================================================================

fn parse_dependency(node: Node<'_, '_>, depth: usize) -> Result<CompositeDependency> {
    if depth > MAX_DEPENDENCY_DEPTH {
        return Err(WizardError::descriptor(format!(
            "dependency nested more than {} levels deep",
            MAX_DEPENDENCY_DEPTH
        )));
    }

    let operator: DependencyOperator = attr_enum(node, "operator", "And", "dependency operator")?;
    let mut children = Vec::new();

    for el in node.children().filter(Node::is_element) {
        match el.tag_name().name().to_lowercase().as_str() {
            "flagdependency" => children.push(CompositeDependency::flag(
                el.attribute("flag").unwrap_or_default(),
                el.attribute("value").unwrap_or_default(),
            )),
            "filedependency" => {
                let state: FileState = attr_enum(el, "state", "Active", "file state")?;
                children.push(CompositeDependency::file(
                    clean_path(el.attribute("file").unwrap_or_default()),
                    state,
                ));
            }
            "dependencies" => children.push(parse_dependency(el, depth + 1)?),
            other => debug!("Ignoring unsupported dependency element <{}>", other),
        }
    }

    Ok(CompositeDependency::Node { operator, children })
}

fn parse_conditional_installs(patterns: Node<'_, '_>) -> Result<Vec<ConditionalInstallPattern>> {
    let mut result = Vec::new();
    for pattern in children(patterns, "pattern") {
        let (Some(dep), Some(files)) = (child(pattern, "dependencies"), child(pattern, "files"))
        else {
            warn!("Skipping conditional install pattern without dependencies or files");
            continue;
        };
        result.push(ConditionalInstallPattern {
            dependency: parse_dependency(dep, 1)?,
            files: parse_file_list(files),
        });
    }
    Ok(result)
}

// ============================================================================
// Plugins, groups, steps
// ============================================================================

fn parse_type_descriptor(node: Node<'_, '_>) -> Result<TypeDescriptor> {
    if let Some(type_el) = child(node, "type") {
        let default_type: PluginType = attr_enum(type_el, "name", "Optional", "plugin type")?;
        return Ok(TypeDescriptor::fixed(default_type));
    }

    let Some(dep_type) = child(node, "dependencyType") else {
        return Ok(TypeDescriptor::default());
    };

    let default_type = match child(dep_type, "defaultType") {
        Some(el) => attr_enum(el, "name", "Optional", "plugin type")?,
        None => PluginType::Optional,
    };

    let mut patterns = Vec::new();
    if let Some(patterns_el) = child(dep_type, "patterns") {
        for pattern in children(patterns_el, "pattern") {
            let (Some(dep), Some(type_el)) = (child(pattern, "dependencies"), child(pattern, "type"))
            else {
                continue;
            };
            patterns.push(TypePattern {
                dependency: parse_dependency(dep, 1)?,
                plugin_type: attr_enum(type_el, "name", "Optional", "plugin type")?,
            });
        }
    }

    Ok(TypeDescriptor {
        default_type,
        patterns,
    })
}

fn parse_condition_flags(node: Node<'_, '_>) -> Vec<FlagSetter> {
    let Some(flags) = child(node, "conditionFlags") else {
        return Vec::new();
    };
    flags
        .children()
        .filter(Node::is_element)
        .filter_map(|flag| {
            let name = flag.attribute("name").unwrap_or_default();
            (!name.is_empty()).then(|| FlagSetter::new(name, text_of(flag)))
        })
        .collect()
}

fn parse_plugin(node: Node<'_, '_>) -> Result<Plugin> {
    let type_descriptor = match child(node, "typeDescriptor") {
        Some(td) => parse_type_descriptor(td)?,
        None => TypeDescriptor::default(),
    };

    Ok(Plugin {
        name: node.attribute("name").unwrap_or_default().to_string(),
        description: child(node, "description").map(text_of).unwrap_or_default(),
        image_path: child(node, "image")
            .and_then(|n| n.attribute("path"))
            .map(clean_path)
            .unwrap_or_default(),
        files: child(node, "files").map(parse_file_list).unwrap_or_default(),
        condition_flags: parse_condition_flags(node),
        type_descriptor,
    })
}

fn parse_group(node: Node<'_, '_>) -> Result<Group> {
    let rule: SelectionRule = attr_enum(node, "type", "SelectAny", "group type")?;

    let plugins = match child(node, "plugins") {
        Some(plugins_el) => {
            let mut plugins = children(plugins_el, "plugin")
                .map(parse_plugin)
                .collect::<Result<Vec<_>>>()?;
            order_of(plugins_el)?.apply(&mut plugins, |p| p.name.as_str());
            plugins
        }
        None => Vec::new(),
    };

    Ok(Group {
        name: node.attribute("name").unwrap_or_default().to_string(),
        rule,
        plugins,
    })
}

fn parse_step(node: Node<'_, '_>) -> Result<Step> {
    let visible = child(node, "visible")
        .map(|v| parse_dependency(v, 1))
        .transpose()?;

    let groups = match child(node, "optionalFileGroups") {
        Some(groups_el) => {
            let mut groups = children(groups_el, "group")
                .map(parse_group)
                .collect::<Result<Vec<_>>>()?;
            order_of(groups_el)?.apply(&mut groups, |g| g.name.as_str());
            groups
        }
        None => Vec::new(),
    };

    Ok(Step {
        name: node.attribute("name").unwrap_or_default().to_string(),
        groups,
        visible,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_utf8() {
        assert_eq!(decode_module_config(b"<config/>").unwrap(), "<config/>");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"<config/>");
        assert_eq!(decode_module_config(&bytes).unwrap(), "<config/>");
    }

    #[test]
    fn test_decode_utf16_le_and_be() {
        let text = "<config/>";
        let mut le = UTF16_LE_BOM.to_vec();
        let mut be = UTF16_BE_BOM.to_vec();
        for unit in text.encode_utf16() {
            le.extend_from_slice(&unit.to_le_bytes());
            be.extend_from_slice(&unit.to_be_bytes());
        }
        assert_eq!(decode_module_config(&le).unwrap(), text);
        assert_eq!(decode_module_config(&be).unwrap(), text);
    }

    #[test]
    fn test_decode_rejects_odd_utf16() {
        let bytes = [0xFF, 0xFE, 0x3C];
        assert!(matches!(
            decode_module_config(&bytes),
            Err(WizardError::Encoding(_))
        ));
    }

    #[test]
    fn test_decode_rejects_invalid_utf8() {
        assert!(decode_module_config(&[0xC3, 0x28]).is_err());
    }

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("\\Data\\Meshes\\"), "Data/Meshes");
        assert_eq!(clean_path("/a/b/"), "a/b");
    }

    #[test]
    fn test_dependency_parse_keeps_document_order() {
        let xml = r#"<dependencies operator="Or">
            <fileDependency file="a.esp" state="Missing"/>
            <flagDependency flag="x" value="1"/>
            <gameDependency version="1.0"/>
            <dependencies><flagDependency flag="y" value="2"/></dependencies>
        </dependencies>"#;
        let doc = Document::parse(xml).unwrap();
        let dep = parse_dependency(doc.root_element(), 1).unwrap();

        assert_eq!(
            dep,
            CompositeDependency::or(vec![
                CompositeDependency::file("a.esp", FileState::Missing),
                CompositeDependency::flag("x", "1"),
                CompositeDependency::and(vec![CompositeDependency::flag("y", "2")]),
            ])
        );
    }

    #[test]
    fn test_dependency_rejects_unknown_operator() {
        let doc = Document::parse(r#"<dependencies operator="Xor"/>"#).unwrap();
        let err = parse_dependency(doc.root_element(), 1).unwrap_err();
        assert_eq!(err.to_string(), "Unknown dependency operator 'Xor'");
    }

    #[test]
    fn test_dependency_depth_guard() {
        let depth = MAX_DEPENDENCY_DEPTH + 1;
        let xml = format!(
            "{}{}",
            "<dependencies>".repeat(depth),
            "</dependencies>".repeat(depth)
        );
        let doc = Document::parse(&xml).unwrap();
        assert!(matches!(
            parse_dependency(doc.root_element(), 1),
            Err(WizardError::Descriptor(_))
        ));
    }

    #[test]
    fn test_invalid_priority_defaults_to_zero() {
        let doc = Document::parse(r#"<file source="a" priority="high"/>"#).unwrap();
        assert_eq!(parse_file_mapping(doc.root_element(), false).priority, 0);
    }

    #[test]
    fn test_condition_flags_skip_unnamed() {
        let doc = Document::parse(
            r#"<plugin><conditionFlags>
                <flag name="a"> on </flag>
                <flag name="">ignored</flag>
                <flag name="b"/>
            </conditionFlags></plugin>"#,
        )
        .unwrap();
        let flags = parse_condition_flags(doc.root_element());
        assert_eq!(
            flags,
            vec![FlagSetter::new("a", "on"), FlagSetter::new("b", "")]
        );
    }
}
