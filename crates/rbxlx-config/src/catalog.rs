use rbxlx_dom::Referent;

/// Services emitted into every place, in the order Studio lists them.
pub const STANDARD_SERVICES: &[(&str, &str)] = &[
    ("Workspace", "RBXF4A234D3"),
    ("Players", "RBXF4A234D4"),
    ("Lighting", "RBXF4A234D5"),
    ("ReplicatedFirst", "RBXF4A234D6"),
    ("ReplicatedStorage", "RBXF4A234D7"),
    ("ServerScriptService", "RBXF4A234D8"),
    ("ServerStorage", "RBXF4A234D9"),
    ("StarterGui", "RBXF4A234DA"),
    ("StarterPack", "RBXF4A234DB"),
    ("StarterPlayer", "RBXF4A234DC"),
    ("SoundService", "RBXF4A234DD"),
    ("Teams", "RBXF4A234DE"),
    ("Chat", "RBXF4A234DF"),
    ("LocalizationService", "RBXF4A234E0"),
    ("TestService", "RBXF4A234E1"),
];

/// `(parent service, container, referent)` for the standard nested containers.
pub const STANDARD_SUB_CONTAINERS: &[(&str, &str, &str)] = &[
    ("StarterPlayer", "StarterPlayerScripts", "RBXF4A234DC1"),
    ("StarterPlayer", "StarterCharacterScripts", "RBXF4A234DC2"),
];

/// A service or nested container with a fixed referent. The class name is
/// also emitted as the container's `Name` property.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContainerDescriptor {
    pub class_name: String,
    pub referent: Referent,
}

impl ContainerDescriptor {
    pub fn new(class_name: impl Into<String>, referent: Referent) -> Self {
        Self {
            class_name: class_name.into(),
            referent,
        }
    }
}

/// Top-level service plus the containers declared beneath it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceEntry {
    pub container: ContainerDescriptor,
    pub children: Vec<ContainerDescriptor>,
}

impl ServiceEntry {
    pub fn new(container: ContainerDescriptor) -> Self {
        Self {
            container,
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: ContainerDescriptor) -> Self {
        self.children.push(child);
        self
    }

    pub fn name(&self) -> &str {
        &self.container.class_name
    }
}

/// Where a container name resolves within the catalog.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ContainerLocation<'a> {
    Service(&'a ServiceEntry),
    SubContainer {
        service: &'a ServiceEntry,
        container: &'a ContainerDescriptor,
    },
}

/// Ordered catalog of services scripts can be placed under.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Catalog {
    services: Vec<ServiceEntry>,
}

impl Catalog {
    pub fn new(services: Vec<ServiceEntry>) -> Self {
        Self { services }
    }

    pub fn services(&self) -> &[ServiceEntry] {
        &self.services
    }

    pub fn locate(&self, name: &str) -> Option<ContainerLocation<'_>> {
        for service in &self.services {
            if service.name() == name {
                return Some(ContainerLocation::Service(service));
            }
            if let Some(container) = service.children.iter().find(|c| c.class_name == name) {
                return Some(ContainerLocation::SubContainer { service, container });
            }
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    /// Every fixed referent, services first within each entry.
    pub fn referents(&self) -> impl Iterator<Item = &Referent> {
        self.services.iter().flat_map(|service| {
            std::iter::once(&service.container.referent)
                .chain(service.children.iter().map(|child| &child.referent))
        })
    }
}
