//! Networks, their objects and the opaque code objects they own

use serde::{Deserialize, Serialize};

use crate::template::GeneratedSource;

/// A preprocessor macro, rendered as `-DNAME` or `-DNAME=VALUE`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Macro {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Macro {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: None,
        }
    }

    pub fn with_value(
        name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: Some(value.into()),
        }
    }

    /// Compiler flag for this macro
    pub fn to_flag(&self) -> String {
        match &self.value {
            Some(value) => format!("-D{}={}", self.name, value),
            None => format!("-D{}", self.name),
        }
    }
}

/// Extra compiler/linker requirements declared by a code object
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct CompilerRequirements {
    #[serde(default)]
    pub define_macros: Vec<Macro>,
    #[serde(default)]
    pub include_dirs: Vec<String>,
    #[serde(default)]
    pub library_dirs: Vec<String>,
    #[serde(default)]
    pub libraries: Vec<String>,
    /// Additional source files that must be compiled into the module
    #[serde(default)]
    pub sources: Vec<String>,
}

/// A generated per-object update routine bound to exactly one clock.
///
/// The device never looks inside `source`; it only schedules and packages it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CodeObject {
    pub name: String,
    pub owner: String,
    pub clock: String,
    #[serde(default)]
    pub compiler_kwds: CompilerRequirements,
    #[serde(default)]
    pub source: GeneratedSource,
}

impl CodeObject {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        clock: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            clock: clock.into(),
            compiler_kwds: CompilerRequirements::default(),
            source: GeneratedSource::default(),
        }
    }

    pub fn with_source(
        mut self,
        source: GeneratedSource,
    ) -> Self {
        self.source = source;
        self
    }

    pub fn with_requirements(
        mut self,
        requirements: CompilerRequirements,
    ) -> Self {
        self.compiler_kwds = requirements;
        self
    }
}

/// Kind of simulation object; only synapses get special treatment
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    NeuronGroup,
    Synapses,
    Monitor,
    #[default]
    Other,
}

/// An object scheduled by a network
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkObject {
    pub name: String,
    pub clock: String,
    #[serde(default)]
    pub kind: ObjectKind,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(default)]
    pub code_objects: Vec<CodeObject>,
}

fn default_active() -> bool {
    true
}

impl NetworkObject {
    pub fn new(
        name: impl Into<String>,
        clock: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            clock: clock.into(),
            kind: ObjectKind::Other,
            active: true,
            code_objects: Vec::new(),
        }
    }

    pub fn with_kind(
        mut self,
        kind: ObjectKind,
    ) -> Self {
        self.kind = kind;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    /// Attach a code object; it is bound to this object's clock
    pub fn with_code_object(
        mut self,
        name: impl Into<String>,
    ) -> Self {
        let codeobj = CodeObject::new(name, self.name.clone(), self.clock.clone());
        self.code_objects.push(codeobj);
        self
    }

    pub fn push_code_object(
        &mut self,
        codeobj: CodeObject,
    ) {
        self.code_objects.push(codeobj);
    }
}

/// A resolved simulation graph.
///
/// `objects` is kept in the network's scheduling order (the order produced by
/// the code generator's object sort), which is the order code objects are
/// registered in the generated program.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Network {
    pub name: String,
    /// Logical time in seconds
    #[serde(default)]
    pub t: f64,
    #[serde(default)]
    pub objects: Vec<NetworkObject>,
}

impl Network {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            t: 0.0,
            objects: Vec::new(),
        }
    }

    pub fn with_object(
        mut self,
        object: NetworkObject,
    ) -> Self {
        self.objects.push(object);
        self
    }

    pub fn add(
        &mut self,
        object: NetworkObject,
    ) {
        self.objects.push(object);
    }

    /// Objects in scheduling order
    pub fn sorted_objects(&self) -> &[NetworkObject] {
        &self.objects
    }

    /// Distinct clocks of all objects, in first-use order
    pub fn clock_names(&self) -> Vec<&str> {
        let mut clocks: Vec<&str> = Vec::new();
        for obj in &self.objects {
            if !clocks.contains(&obj.clock.as_str()) {
                clocks.push(&obj.clock);
            }
        }
        clocks
    }

    /// `(clock, code object)` pairs of active objects in scheduling order
    pub fn active_code_objects(&self) -> impl Iterator<Item = (&str, &CodeObject)> {
        self.objects
            .iter()
            .filter(|obj| obj.active)
            .flat_map(|obj| {
                obj.code_objects
                    .iter()
                    .map(move |codeobj| (obj.clock.as_str(), codeobj))
            })
    }

    /// All code objects, active or not
    pub fn all_code_objects(&self) -> impl Iterator<Item = &CodeObject> {
        self.objects.iter().flat_map(|obj| obj.code_objects.iter())
    }
}
