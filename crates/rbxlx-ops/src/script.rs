use rbxlx_config::ScriptEntry;
use rbxlx_dom::{Item, Property, Referent, ReferentGenerator};

/// A script ready to be placed: fresh referent plus its full source text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptNode {
    pub referent: Referent,
    pub class_name: String,
    pub name: String,
    pub source: String,
    /// Catalog container this node goes under.
    pub parent: String,
}

impl ScriptNode {
    /// Source length in characters.
    pub fn chars(&self) -> usize {
        self.source.chars().count()
    }

    /// The `Item` carrying `Name` and a CDATA-embedded `Source`.
    pub fn into_item(self) -> Item {
        Item::new(self.class_name, self.referent)
            .with_property(Property::string("Name", self.name))
            .with_property(Property::protected_string("Source", self.source))
    }
}

/// Pairs a manifest entry with its loaded source, drawing one referent.
pub fn build_script_node(
    entry: &ScriptEntry,
    source: String,
    generator: &mut ReferentGenerator,
) -> ScriptNode {
    ScriptNode {
        referent: generator.next_referent(),
        class_name: entry.class_name.clone(),
        name: entry.name.clone(),
        source,
        parent: entry.parent.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn node_takes_entry_metadata_and_next_referent() {
        let entry = ScriptEntry::new(
            "ServerScriptService/FightServer.server.lua",
            "Script",
            "FightServer",
            "ServerScriptService",
        );
        let mut generator = ReferentGenerator::new();
        let first = build_script_node(&entry, "print('hi')".into(), &mut generator);
        let second = build_script_node(&entry, String::new(), &mut generator);

        assert_eq!(first.referent.as_str(), "RBX00000065");
        assert_eq!(second.referent.as_str(), "RBX00000066");
        assert_eq!(first.class_name, "Script");
        assert_eq!(first.parent, "ServerScriptService");
    }

    #[test]
    fn item_keeps_class_verbatim_and_source_raw() {
        let entry = ScriptEntry::new("x.lua", "CustomScriptKind", "Weird & <Name>", "Workspace");
        let mut generator = ReferentGenerator::new();
        let node = build_script_node(&entry, "a ]]> b".into(), &mut generator);
        assert_eq!(node.chars(), 7);

        let item = node.into_item();
        assert_eq!(item.class_name, "CustomScriptKind");
        assert_eq!(item.name(), Some("Weird & <Name>"));
        assert_eq!(item.protected_string("Source"), Some("a ]]> b"));
        assert!(item.children.is_empty());
    }

    #[test]
    fn chars_counts_characters_not_bytes() {
        let entry = ScriptEntry::new("x.lua", "ModuleScript", "Unicode", "ReplicatedStorage");
        let node = build_script_node(&entry, "-- héllo ✓".into(), &mut ReferentGenerator::new());
        assert_eq!(node.chars(), 10);
    }
}
