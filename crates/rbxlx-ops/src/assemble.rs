use std::collections::HashMap;

use rbxlx_config::{Catalog, ContainerDescriptor, ScriptEntry};
use rbxlx_dom::{Item, Property};
use thiserror::Error;
use tracing::debug;

use crate::script::ScriptNode;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AssembleError {
    #[error("script '{script}' targets unknown container '{parent}'")]
    UnknownTargetContainer { script: String, parent: String },
}

/// Places script nodes into the catalog's container tree.
pub struct HierarchyAssembler<'a> {
    catalog: &'a Catalog,
}

impl<'a> HierarchyAssembler<'a> {
    pub fn new(catalog: &'a Catalog) -> Self {
        Self { catalog }
    }

    /// Fails on the first entry whose parent is not in the catalog.
    pub fn check_targets<'e, I>(&self, entries: I) -> Result<(), AssembleError>
    where
        I: IntoIterator<Item = &'e ScriptEntry>,
    {
        for entry in entries {
            self.check(&entry.name, &entry.parent)?;
        }
        Ok(())
    }

    /// Builds one `Item` per service in catalog order. Within a service,
    /// nested containers come first, then scripts placed directly on it;
    /// scripts keep the order they were given in.
    pub fn assemble(&self, nodes: Vec<ScriptNode>) -> Result<Vec<Item>, AssembleError> {
        for node in &nodes {
            self.check(&node.name, &node.parent)?;
        }

        let mut by_parent: HashMap<String, Vec<ScriptNode>> = HashMap::new();
        for node in nodes {
            by_parent.entry(node.parent.clone()).or_default().push(node);
        }

        let mut items = Vec::with_capacity(self.catalog.services().len());
        for service in self.catalog.services() {
            let mut item = container_item(&service.container);

            for container in &service.children {
                let mut nested = container_item(container);
                nested.children = take_scripts(&mut by_parent, &container.class_name);
                debug!(
                    service = service.name(),
                    container = %container.class_name,
                    scripts = nested.children.len(),
                    "placed nested container"
                );
                item.children.push(nested);
            }

            let direct = take_scripts(&mut by_parent, service.name());
            debug!(
                service = service.name(),
                scripts = direct.len(),
                "placed service"
            );
            item.children.extend(direct);
            items.push(item);
        }

        Ok(items)
    }

    fn check(&self, script: &str, parent: &str) -> Result<(), AssembleError> {
        if self.catalog.contains(parent) {
            Ok(())
        } else {
            Err(AssembleError::UnknownTargetContainer {
                script: script.to_string(),
                parent: parent.to_string(),
            })
        }
    }
}

fn container_item(container: &ContainerDescriptor) -> Item {
    Item::new(container.class_name.clone(), container.referent.clone())
        .with_property(Property::string("Name", container.class_name.clone()))
}

fn take_scripts(by_parent: &mut HashMap<String, Vec<ScriptNode>>, parent: &str) -> Vec<Item> {
    by_parent
        .remove(parent)
        .unwrap_or_default()
        .into_iter()
        .map(ScriptNode::into_item)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rbxlx_config::ServiceEntry;
    use rbxlx_dom::{Referent, ReferentGenerator};

    fn referent(value: &str) -> Referent {
        Referent::parse(value).unwrap()
    }

    fn node(generator: &mut ReferentGenerator, name: &str, parent: &str) -> ScriptNode {
        ScriptNode {
            referent: generator.next_referent(),
            class_name: "LocalScript".into(),
            name: name.into(),
            source: String::new(),
            parent: parent.into(),
        }
    }

    fn small_catalog() -> Catalog {
        Catalog::new(vec![
            ServiceEntry::new(ContainerDescriptor::new("Workspace", referent("RBXA"))),
            ServiceEntry::new(ContainerDescriptor::new("StarterPlayer", referent("RBXB")))
                .with_child(ContainerDescriptor::new(
                    "StarterPlayerScripts",
                    referent("RBXB1"),
                )),
        ])
    }

    fn names(items: &[Item]) -> Vec<&str> {
        items.iter().filter_map(Item::name).collect()
    }

    #[test]
    fn empty_containers_are_still_emitted() {
        let catalog = small_catalog();
        let items = HierarchyAssembler::new(&catalog).assemble(Vec::new()).unwrap();
        assert_eq!(names(&items), vec!["Workspace", "StarterPlayer"]);
        assert!(items[0].children.is_empty());
        assert_eq!(names(&items[1].children), vec!["StarterPlayerScripts"]);
        assert!(items[1].children[0].children.is_empty());
    }

    #[test]
    fn nested_containers_precede_direct_scripts() {
        let catalog = small_catalog();
        let mut generator = ReferentGenerator::new();
        let nodes = vec![
            node(&mut generator, "Direct", "StarterPlayer"),
            node(&mut generator, "Nested", "StarterPlayerScripts"),
            node(&mut generator, "Second", "StarterPlayer"),
        ];
        let items = HierarchyAssembler::new(&catalog).assemble(nodes).unwrap();

        let starter_player = &items[1];
        assert_eq!(
            names(&starter_player.children),
            vec!["StarterPlayerScripts", "Direct", "Second"]
        );
        assert_eq!(names(&starter_player.children[0].children), vec!["Nested"]);
    }

    #[test]
    fn unknown_parent_is_fatal() {
        let catalog = small_catalog();
        let mut generator = ReferentGenerator::new();
        let err = HierarchyAssembler::new(&catalog)
            .assemble(vec![node(&mut generator, "Lost", "Nowhere")])
            .unwrap_err();
        assert_eq!(
            err,
            AssembleError::UnknownTargetContainer {
                script: "Lost".into(),
                parent: "Nowhere".into(),
            }
        );
    }

    #[test]
    fn check_targets_reports_entry_names() {
        let catalog = small_catalog();
        let entries = [
            ScriptEntry::new("a.lua", "Script", "Fine", "Workspace"),
            ScriptEntry::new("b.lua", "Script", "Broken", "ServerScriptService"),
        ];
        let err = HierarchyAssembler::new(&catalog)
            .check_targets(&entries)
            .unwrap_err();
        assert!(matches!(
            err,
            AssembleError::UnknownTargetContainer { ref script, .. } if script == "Broken"
        ));
    }
}
