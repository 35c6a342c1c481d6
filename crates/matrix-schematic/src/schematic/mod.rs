//! In-memory KiCad schematic and the authoring calls used to fill it.
//!
//! A [`Schematic`] is built for one board, filled through `add_*` calls and
//! written with [`Schematic::save`]. Nothing is shared between boards.

pub mod library;
pub mod writer;

use std::path::Path;

use log::debug;
use uuid::Uuid;

use crate::error::SchematicError;
use library::{LibSymbol, Library, PlacedPin};

/// Horizontal justification of a text field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Justify {
    Left,
    Right,
}

impl Justify {
    pub fn as_str(self) -> &'static str {
        match self {
            Justify::Left => "left",
            Justify::Right => "right",
        }
    }
}

/// A property (Reference, Value, ...) attached to a placed symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub position: [f64; 2],
    pub rotation: f64,
    pub justify: Option<Justify>,
    pub hidden: bool,
}

/// Overrides for where a field is drawn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldEffects {
    pub position: [f64; 2],
    pub rotation: f64,
    pub justify: Option<Justify>,
}

#[derive(Debug, Clone)]
pub struct PlacedSymbol {
    pub lib_id: String,
    pub reference: String,
    pub position: [f64; 2],
    pub rotation: f64,
    pub uuid: Uuid,
    pub fields: Vec<Field>,
    pub pins: Vec<PlacedPin>,
}

impl PlacedSymbol {
    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn pin(&self, number: &str) -> Option<&PlacedPin> {
        self.pins.iter().find(|p| p.number == number)
    }

    /// Move or rotate a field, like nudging it in the editor.
    pub fn set_field_effects(&mut self, name: &str, effects: FieldEffects) -> bool {
        match self.fields.iter_mut().find(|f| f.name == name) {
            Some(field) => {
                field.position = effects.position;
                field.rotation = effects.rotation;
                field.justify = effects.justify;
                true
            }
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Wire {
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub uuid: Uuid,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub position: [f64; 2],
    pub uuid: Uuid,
}

/// A local net label.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: [f64; 2],
    pub uuid: Uuid,
}

#[derive(Debug, Clone)]
pub struct Schematic {
    pub title: String,
    pub uuid: Uuid,
    library: Library,
    /// UUIDs are derived from this namespace, so the same board always
    /// produces the same file.
    namespace: Uuid,
    counter: u64,
    pub symbols: Vec<PlacedSymbol>,
    pub wires: Vec<Wire>,
    pub junctions: Vec<Junction>,
    pub labels: Vec<Label>,
}

impl Schematic {
    pub fn new(title: &str, library: Library) -> Self {
        let namespace = Uuid::new_v5(
            &Uuid::NAMESPACE_URL,
            format!("urn:matrix-schematic:{title}").as_bytes(),
        );
        Self {
            title: title.to_string(),
            uuid: Uuid::new_v5(&namespace, b"sheet"),
            library,
            namespace,
            counter: 0,
            symbols: Vec::new(),
            wires: Vec::new(),
            junctions: Vec::new(),
            labels: Vec::new(),
        }
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    fn next_uuid(&mut self, kind: &str) -> Uuid {
        self.counter += 1;
        Uuid::new_v5(&self.namespace, format!("{kind}/{}", self.counter).as_bytes())
    }

    /// Place a library symbol. Fields start at the library defaults, offset
    /// to the placement point.
    pub fn add_component(
        &mut self,
        lib_id: &str,
        reference: &str,
        position: [f64; 2],
        rotation: f64,
    ) -> Result<&mut PlacedSymbol, SchematicError> {
        if self.symbols.iter().any(|s| s.reference == reference) {
            return Err(SchematicError::DuplicateReference(reference.to_string()));
        }
        let lib_symbol = self.library.get(lib_id)?;
        let fields = default_fields(lib_symbol, reference, position);
        let pins = lib_symbol.placed_pins(position, rotation);
        let uuid = self.next_uuid("symbol");

        debug!("{reference} ({lib_id}) at {position:?} rot {rotation}");
        self.symbols.push(PlacedSymbol {
            lib_id: lib_id.to_string(),
            reference: reference.to_string(),
            position,
            rotation,
            uuid,
            fields,
            pins,
        });
        let last = self.symbols.len() - 1;
        Ok(&mut self.symbols[last])
    }

    pub fn add_wire(&mut self, start: [f64; 2], end: [f64; 2]) {
        let uuid = self.next_uuid("wire");
        self.wires.push(Wire { start, end, uuid });
    }

    pub fn add_junction(&mut self, position: [f64; 2]) {
        let uuid = self.next_uuid("junction");
        self.junctions.push(Junction { position, uuid });
    }

    pub fn add_label(&mut self, text: &str, position: [f64; 2]) {
        let uuid = self.next_uuid("label");
        self.labels.push(Label {
            text: text.to_string(),
            position,
            uuid,
        });
    }

    pub fn symbol(&self, reference: &str) -> Option<&PlacedSymbol> {
        self.symbols.iter().find(|s| s.reference == reference)
    }

    /// Render the whole sheet as `.kicad_sch` text.
    pub fn to_kicad_string(&self) -> String {
        writer::to_sexpr(self).to_pretty_string()
    }

    /// Write the sheet to `path`.
    pub fn save(&self, path: &Path) -> Result<(), SchematicError> {
        std::fs::write(path, self.to_kicad_string())?;
        Ok(())
    }
}

fn default_fields(lib: &LibSymbol, reference: &str, at: [f64; 2]) -> Vec<Field> {
    let mut fields = Vec::new();
    for prop in lib.definition.find_all("property") {
        let (Some(name), Some(value)) = (prop.atom_at(0), prop.atom_at(1)) else {
            continue;
        };
        let value = if name == "Reference" { reference } else { value };
        let local = prop
            .find("at")
            .map(|a| [a.f64_at(0).unwrap_or(0.0), a.f64_at(1).unwrap_or(0.0)])
            .unwrap_or([0.0, 0.0]);
        let effects = prop.find("effects");
        let hidden = effects
            .map(|e| e.children().iter().any(|c| c.as_atom() == Some("hide")))
            .unwrap_or(false);
        let justify = effects
            .and_then(|e| e.value("justify"))
            .and_then(|j| match j {
                "left" => Some(Justify::Left),
                "right" => Some(Justify::Right),
                _ => None,
            });
        fields.push(Field {
            name: name.to_string(),
            value: value.to_string(),
            // Field offsets are not rotated with the symbol, matching KiCad
            // placing text upright.
            position: [at[0] + local[0], at[1] - local[1]],
            rotation: 0.0,
            justify,
            hidden,
        });
    }
    fields
}
