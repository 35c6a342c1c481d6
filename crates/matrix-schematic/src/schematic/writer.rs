//! `.kicad_sch` serialization (KiCad 8, file version 20231120).

use std::collections::BTreeSet;

use super::{Field, Junction, Label, PlacedSymbol, Schematic, Wire};
use crate::parsers::kicad_sexpr::SExpr;

pub const FILE_VERSION: &str = "20231120";
pub const GENERATOR: &str = "matrix-schematic";

/// Sheet size. The LED grid starts 250 units down, which does not fit A4.
const PAPER: &str = "A3";

const FONT_SIZE: f64 = 1.27;

/// Build the complete sheet.
pub fn to_sexpr(sch: &Schematic) -> SExpr {
    let mut items = vec![
        SExpr::node("version", vec![SExpr::atom(FILE_VERSION)]),
        SExpr::node("generator", vec![SExpr::string(GENERATOR)]),
        SExpr::node(
            "generator_version",
            vec![SExpr::string(env!("CARGO_PKG_VERSION"))],
        ),
        SExpr::node("uuid", vec![SExpr::string(sch.uuid.to_string())]),
        SExpr::node("paper", vec![SExpr::string(PAPER)]),
        SExpr::node(
            "title_block",
            vec![SExpr::node("title", vec![SExpr::string(sch.title.clone())])],
        ),
    ];

    // Only the symbols actually placed, in a stable order.
    let used: BTreeSet<&str> = sch.symbols.iter().map(|s| s.lib_id.as_str()).collect();
    let mut lib_symbols = Vec::new();
    for lib_id in used {
        if let Ok(sym) = sch.library().get(lib_id) {
            lib_symbols.push(sym.definition.clone());
        }
    }
    items.push(SExpr::node("lib_symbols", lib_symbols));

    items.extend(sch.junctions.iter().map(junction_to_sexpr));
    items.extend(sch.wires.iter().map(wire_to_sexpr));
    items.extend(sch.labels.iter().map(label_to_sexpr));
    items.extend(sch.symbols.iter().map(|s| symbol_to_sexpr(s, sch)));

    items.push(SExpr::node(
        "sheet_instances",
        vec![SExpr::node(
            "path",
            vec![
                SExpr::string("/"),
                SExpr::node("page", vec![SExpr::string("1")]),
            ],
        )],
    ));

    SExpr::node("kicad_sch", items)
}

fn at(pos: [f64; 2]) -> SExpr {
    SExpr::node("at", vec![SExpr::num(pos[0]), SExpr::num(pos[1])])
}

fn at_rot(pos: [f64; 2], rotation: f64) -> SExpr {
    SExpr::node(
        "at",
        vec![SExpr::num(pos[0]), SExpr::num(pos[1]), SExpr::num(rotation)],
    )
}

fn uuid_node(u: &uuid::Uuid) -> SExpr {
    SExpr::node("uuid", vec![SExpr::string(u.to_string())])
}

fn font() -> SExpr {
    SExpr::node(
        "font",
        vec![SExpr::node(
            "size",
            vec![SExpr::num(FONT_SIZE), SExpr::num(FONT_SIZE)],
        )],
    )
}

fn junction_to_sexpr(junction: &Junction) -> SExpr {
    SExpr::node(
        "junction",
        vec![
            at(junction.position),
            SExpr::node("diameter", vec![SExpr::num(0.0)]),
            SExpr::node(
                "color",
                vec![
                    SExpr::num(0.0),
                    SExpr::num(0.0),
                    SExpr::num(0.0),
                    SExpr::num(0.0),
                ],
            ),
            uuid_node(&junction.uuid),
        ],
    )
}

fn wire_to_sexpr(wire: &Wire) -> SExpr {
    let xy = |p: [f64; 2]| SExpr::node("xy", vec![SExpr::num(p[0]), SExpr::num(p[1])]);
    SExpr::node(
        "wire",
        vec![
            SExpr::node("pts", vec![xy(wire.start), xy(wire.end)]),
            SExpr::node(
                "stroke",
                vec![
                    SExpr::node("width", vec![SExpr::num(0.0)]),
                    SExpr::node("type", vec![SExpr::atom("default")]),
                ],
            ),
            uuid_node(&wire.uuid),
        ],
    )
}

fn label_to_sexpr(label: &Label) -> SExpr {
    SExpr::node(
        "label",
        vec![
            SExpr::string(label.text.clone()),
            at_rot(label.position, 0.0),
            SExpr::flag("fields_autoplaced", true),
            SExpr::node(
                "effects",
                vec![
                    font(),
                    SExpr::node("justify", vec![SExpr::atom("left"), SExpr::atom("bottom")]),
                ],
            ),
            uuid_node(&label.uuid),
        ],
    )
}

fn field_to_sexpr(field: &Field) -> SExpr {
    let mut effects = vec![font()];
    if let Some(justify) = field.justify {
        effects.push(SExpr::node("justify", vec![SExpr::atom(justify.as_str())]));
    }
    if field.hidden {
        effects.push(SExpr::atom("hide"));
    }
    SExpr::node(
        "property",
        vec![
            SExpr::string(field.name.clone()),
            SExpr::string(field.value.clone()),
            at_rot(field.position, field.rotation),
            SExpr::node("effects", effects),
        ],
    )
}

fn symbol_to_sexpr(symbol: &PlacedSymbol, sch: &Schematic) -> SExpr {
    let mut items = vec![
        SExpr::node("lib_id", vec![SExpr::string(symbol.lib_id.clone())]),
        at_rot(symbol.position, symbol.rotation),
        SExpr::node("unit", vec![SExpr::num(1.0)]),
        SExpr::flag("exclude_from_sim", false),
        SExpr::flag("in_bom", true),
        SExpr::flag("on_board", true),
        SExpr::flag("dnp", false),
        uuid_node(&symbol.uuid),
    ];

    items.extend(symbol.fields.iter().map(field_to_sexpr));

    for (i, pin) in symbol.pins.iter().enumerate() {
        let pin_uuid = uuid::Uuid::new_v5(&symbol.uuid, format!("pin/{i}").as_bytes());
        items.push(SExpr::node(
            "pin",
            vec![SExpr::string(pin.number.clone()), uuid_node(&pin_uuid)],
        ));
    }

    items.push(SExpr::node(
        "instances",
        vec![SExpr::node(
            "project",
            vec![
                SExpr::string(sch.title.clone()),
                SExpr::node(
                    "path",
                    vec![
                        SExpr::string(format!("/{}", sch.uuid)),
                        SExpr::node("reference", vec![SExpr::string(symbol.reference.clone())]),
                        SExpr::node("unit", vec![SExpr::num(1.0)]),
                    ],
                ),
            ],
        )],
    ));

    SExpr::node("symbol", items)
}

#[cfg(test)]
mod tests {
    use super::super::library::{Library, DIODE, SWITCH};
    use super::*;
    use crate::parsers::kicad_sexpr;

    fn sample() -> Schematic {
        let mut sch = Schematic::new("left", Library::builtin().unwrap());
        sch.add_component(SWITCH, "S1", [66.0, 52.0], 0.0).unwrap();
        sch.add_component(DIODE, "D1", [74.0, 56.0], 270.0).unwrap();
        sch.add_wire([60.92, 52.0], [60.0, 52.0]);
        sch.add_junction([60.0, 52.0]);
        sch.add_label("col0", [60.0, 35.0]);
        sch
    }

    #[test]
    fn test_header() {
        let root = kicad_sexpr::parse(sample().to_kicad_string().as_bytes()).unwrap();
        assert_eq!(root.tag(), Some("kicad_sch"));
        assert_eq!(root.value("version"), Some(FILE_VERSION));
        assert_eq!(root.value("generator"), Some(GENERATOR));
        assert_eq!(root.value("paper"), Some(PAPER));
        assert!(root.find("sheet_instances").is_some());
    }

    #[test]
    fn test_lib_symbols_only_used() {
        let root = kicad_sexpr::parse(sample().to_kicad_string().as_bytes()).unwrap();
        let libs = root.find("lib_symbols").unwrap();
        let names: Vec<&str> = libs
            .find_all("symbol")
            .iter()
            .filter_map(|s| s.atom_at(0))
            .collect();
        assert_eq!(names, vec![DIODE, SWITCH]);
    }

    #[test]
    fn test_symbol_instance() {
        let sch = sample();
        let root = kicad_sexpr::parse(sch.to_kicad_string().as_bytes()).unwrap();
        let symbols = root.find_all("symbol");
        assert_eq!(symbols.len(), 2);

        let d1 = symbols[1];
        assert_eq!(d1.value("lib_id"), Some(DIODE));
        let at = d1.find("at").unwrap();
        assert_eq!(at.f64_at(0), Some(74.0));
        assert_eq!(at.f64_at(2), Some(270.0));
        assert_eq!(d1.find_all("pin").len(), 2);

        let path = d1.find("instances").unwrap().find("project").unwrap().find("path").unwrap();
        assert_eq!(path.atom_at(0), Some(format!("/{}", sch.uuid).as_str()));
        assert_eq!(path.value("reference"), Some("D1"));
    }

    #[test]
    fn test_wire_junction_label() {
        let root = kicad_sexpr::parse(sample().to_kicad_string().as_bytes()).unwrap();
        let wire = root.find("wire").unwrap();
        let pts = wire.find("pts").unwrap().find_all("xy");
        assert_eq!(pts[0].f64_at(0), Some(60.92));
        assert_eq!(pts[1].f64_at(0), Some(60.0));

        let junction = root.find("junction").unwrap();
        assert_eq!(junction.find("at").unwrap().f64_at(1), Some(52.0));

        let label = root.find("label").unwrap();
        assert_eq!(label.atom_at(0), Some("col0"));
    }

    #[test]
    fn test_output_is_stable() {
        assert_eq!(sample().to_kicad_string(), sample().to_kicad_string());
    }
}
