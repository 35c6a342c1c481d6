//! Library symbols embedded in every generated schematic.
//!
//! The definitions are the KiCad 8 `Switch:SW_Push`, `Device:D` and
//! `Device:LED` symbols with their graphics trimmed down. They are written
//! into the `lib_symbols` section of the output and are also the source of
//! truth for pin positions, so wires always land on the pins KiCad draws.

use crate::error::SchematicError;
use crate::parsers::kicad_sexpr::{self, SExpr};
use crate::types::round_f64;

pub const SWITCH: &str = "Switch:SW_Push";
pub const DIODE: &str = "Device:D";
pub const LED: &str = "Device:LED";

const SW_PUSH_DEF: &str = r#"(symbol "Switch:SW_Push"
	(pin_numbers hide)
	(pin_names (offset 1.016) hide)
	(exclude_from_sim no)
	(in_bom yes)
	(on_board yes)
	(property "Reference" "SW" (at 1.27 2.54 0) (effects (font (size 1.27 1.27)) (justify left)))
	(property "Value" "SW_Push" (at 0 -1.524 0) (effects (font (size 1.27 1.27))))
	(property "Footprint" "" (at 0 5.08 0) (effects (font (size 1.27 1.27)) hide))
	(property "Datasheet" "~" (at 0 5.08 0) (effects (font (size 1.27 1.27)) hide))
	(property "Description" "Push button switch, generic, two pins" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
	(symbol "SW_Push_0_1"
		(circle (center -2.032 0) (radius 0.508) (stroke (width 0) (type default)) (fill (type none)))
		(polyline (pts (xy 0 1.27) (xy 0 3.048)) (stroke (width 0) (type default)) (fill (type none)))
		(polyline (pts (xy 2.54 1.27) (xy -2.54 1.27)) (stroke (width 0) (type default)) (fill (type none)))
		(circle (center 2.032 0) (radius 0.508) (stroke (width 0) (type default)) (fill (type none)))
		(pin passive line (at -5.08 0 0) (length 2.54) (name "1" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
		(pin passive line (at 5.08 0 180) (length 2.54) (name "2" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27)))))
	)
)"#;

const DIODE_DEF: &str = r#"(symbol "Device:D"
	(pin_numbers hide)
	(pin_names (offset 1.016) hide)
	(exclude_from_sim no)
	(in_bom yes)
	(on_board yes)
	(property "Reference" "D" (at 0 2.54 0) (effects (font (size 1.27 1.27))))
	(property "Value" "D" (at 0 -2.54 0) (effects (font (size 1.27 1.27))))
	(property "Footprint" "" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
	(property "Datasheet" "~" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
	(property "Description" "Diode" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
	(symbol "D_0_1"
		(polyline (pts (xy -1.27 1.27) (xy -1.27 -1.27)) (stroke (width 0.254) (type default)) (fill (type none)))
		(polyline (pts (xy 1.27 0) (xy -1.27 0)) (stroke (width 0) (type default)) (fill (type none)))
		(polyline (pts (xy 1.27 1.27) (xy 1.27 -1.27) (xy -1.27 0) (xy 1.27 1.27)) (stroke (width 0.254) (type default)) (fill (type none)))
	)
	(symbol "D_1_1"
		(pin passive line (at -3.81 0 0) (length 2.54) (name "K" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
		(pin passive line (at 3.81 0 180) (length 2.54) (name "A" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27)))))
	)
)"#;

const LED_DEF: &str = r#"(symbol "Device:LED"
	(pin_numbers hide)
	(pin_names (offset 1.016) hide)
	(exclude_from_sim no)
	(in_bom yes)
	(on_board yes)
	(property "Reference" "D" (at 0 2.54 0) (effects (font (size 1.27 1.27))))
	(property "Value" "LED" (at 0 -2.54 0) (effects (font (size 1.27 1.27))))
	(property "Footprint" "" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
	(property "Datasheet" "~" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
	(property "Description" "Light emitting diode" (at 0 0 0) (effects (font (size 1.27 1.27)) hide))
	(symbol "LED_0_1"
		(polyline (pts (xy -1.27 -1.27) (xy -1.27 1.27)) (stroke (width 0.254) (type default)) (fill (type none)))
		(polyline (pts (xy -1.27 0) (xy 1.27 0)) (stroke (width 0) (type default)) (fill (type none)))
		(polyline (pts (xy 1.27 -1.27) (xy 1.27 1.27) (xy -1.27 0) (xy 1.27 -1.27)) (stroke (width 0.254) (type default)) (fill (type none)))
		(polyline (pts (xy -3.048 -0.762) (xy -4.572 -2.286) (xy -3.81 -2.286) (xy -4.572 -2.286) (xy -4.572 -1.524)) (stroke (width 0) (type default)) (fill (type none)))
		(polyline (pts (xy -1.778 -0.762) (xy -3.302 -2.286) (xy -2.54 -2.286) (xy -3.302 -2.286) (xy -3.302 -1.524)) (stroke (width 0) (type default)) (fill (type none)))
	)
	(symbol "LED_1_1"
		(pin passive line (at -3.81 0 0) (length 2.54) (name "K" (effects (font (size 1.27 1.27)))) (number "1" (effects (font (size 1.27 1.27)))))
		(pin passive line (at 3.81 0 180) (length 2.54) (name "A" (effects (font (size 1.27 1.27)))) (number "2" (effects (font (size 1.27 1.27)))))
	)
)"#;

/// A pin as drawn in the symbol editor (Y axis pointing up).
#[derive(Debug, Clone, PartialEq)]
pub struct LibPin {
    pub number: String,
    pub name: String,
    pub at: [f64; 2],
}

/// A pin resolved to sheet coordinates for a placed symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedPin {
    pub number: String,
    pub name: String,
    pub position: [f64; 2],
}

#[derive(Debug, Clone)]
pub struct LibSymbol {
    pub lib_id: String,
    pub value: String,
    /// Pins in definition order.
    pub pins: Vec<LibPin>,
    pub definition: SExpr,
}

impl LibSymbol {
    fn from_definition(definition: SExpr) -> Result<Self, SchematicError> {
        let lib_id = definition
            .atom_at(0)
            .ok_or_else(|| SchematicError::ParseError("library symbol without a name".into()))?
            .to_string();

        let value = definition
            .find_all("property")
            .into_iter()
            .find(|p| p.atom_at(0) == Some("Value"))
            .and_then(|p| p.atom_at(1))
            .unwrap_or_default()
            .to_string();

        let mut pins = Vec::new();
        for pin in definition.find_recursive("pin") {
            let number = pin.value("number");
            let at = pin.find("at");
            let (Some(number), Some(at)) = (number, at) else {
                return Err(SchematicError::ParseError(format!(
                    "malformed pin in library symbol {lib_id}"
                )));
            };
            pins.push(LibPin {
                number: number.to_string(),
                name: pin.value("name").unwrap_or_default().to_string(),
                at: [at.f64_at(0).unwrap_or(0.0), at.f64_at(1).unwrap_or(0.0)],
            });
        }

        Ok(Self {
            lib_id,
            value,
            pins,
            definition,
        })
    }

    /// Sheet position of pin `number` for a symbol placed at `at` with
    /// `rotation` degrees.
    pub fn pin_position(
        &self,
        number: &str,
        at: [f64; 2],
        rotation: f64,
    ) -> Result<[f64; 2], SchematicError> {
        self.pins
            .iter()
            .find(|p| p.number == number)
            .map(|p| to_sheet(p.at, at, rotation))
            .ok_or_else(|| SchematicError::MissingPin {
                lib_id: self.lib_id.clone(),
                pin: number.to_string(),
            })
    }

    /// Every pin of a placed symbol, in definition order.
    pub fn placed_pins(&self, at: [f64; 2], rotation: f64) -> Vec<PlacedPin> {
        self.pins
            .iter()
            .map(|p| PlacedPin {
                number: p.number.clone(),
                name: p.name.clone(),
                position: to_sheet(p.at, at, rotation),
            })
            .collect()
    }
}

/// Map a symbol-local point onto the sheet.
///
/// Symbol rotation is counter-clockwise and symbol space has Y up while the
/// sheet has Y down. Quarter turns are exact so that pins stay on grid.
pub fn to_sheet(local: [f64; 2], at: [f64; 2], rotation: f64) -> [f64; 2] {
    let [x, y] = local;
    let (rx, ry) = match rotation.rem_euclid(360.0) {
        r if r == 0.0 => (x, y),
        r if r == 90.0 => (-y, x),
        r if r == 180.0 => (-x, -y),
        r if r == 270.0 => (y, -x),
        r => {
            let (sin, cos) = r.to_radians().sin_cos();
            (x * cos - y * sin, x * sin + y * cos)
        }
    };
    [round_f64(at[0] + rx, 4), round_f64(at[1] - ry, 4)]
}

/// The symbols a matrix schematic is built from.
#[derive(Debug, Clone)]
pub struct Library {
    symbols: Vec<LibSymbol>,
}

impl Library {
    pub fn builtin() -> Result<Self, SchematicError> {
        let symbols = [SW_PUSH_DEF, DIODE_DEF, LED_DEF]
            .iter()
            .map(|def| {
                let sexpr = kicad_sexpr::parse(def.as_bytes()).map_err(|e| {
                    SchematicError::ParseError(format!("built-in symbol library: {e}"))
                })?;
                LibSymbol::from_definition(sexpr)
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { symbols })
    }

    pub fn get(&self, lib_id: &str) -> Result<&LibSymbol, SchematicError> {
        self.symbols
            .iter()
            .find(|s| s.lib_id == lib_id)
            .ok_or_else(|| SchematicError::UnknownSymbol(lib_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_builtin_library_loads() {
        let lib = Library::builtin().unwrap();
        for id in [SWITCH, DIODE, LED] {
            let sym = lib.get(id).unwrap();
            assert_eq!(sym.lib_id, id);
            assert_eq!(sym.pins.len(), 2);
        }
        assert_eq!(lib.get(DIODE).unwrap().value, "D");
        assert!(matches!(
            lib.get("Device:R"),
            Err(SchematicError::UnknownSymbol(_))
        ));
    }

    #[test]
    fn test_diode_pin_order() {
        let lib = Library::builtin().unwrap();
        let d = lib.get(DIODE).unwrap();
        assert_eq!(d.pins[0].number, "1");
        assert_eq!(d.pins[0].name, "K");
        assert_eq!(d.pins[1].number, "2");
        assert_eq!(d.pins[1].name, "A");
    }

    #[test]
    fn test_switch_pins_unrotated() {
        let lib = Library::builtin().unwrap();
        let sw = lib.get(SWITCH).unwrap();
        let p1 = sw.pin_position("1", [66.0, 52.0], 0.0).unwrap();
        let p2 = sw.pin_position("2", [66.0, 52.0], 0.0).unwrap();
        assert_abs_diff_eq!(p1[0], 60.92, epsilon = 1e-9);
        assert_abs_diff_eq!(p1[1], 52.0, epsilon = 1e-9);
        assert_abs_diff_eq!(p2[0], 71.08, epsilon = 1e-9);
    }

    #[test]
    fn test_diode_rotated_270_puts_cathode_on_top() {
        let lib = Library::builtin().unwrap();
        let d = lib.get(DIODE).unwrap();
        let k = d.pin_position("1", [74.0, 56.0], 270.0).unwrap();
        let a = d.pin_position("2", [74.0, 56.0], 270.0).unwrap();
        assert_abs_diff_eq!(k[0], 74.0, epsilon = 1e-9);
        assert_abs_diff_eq!(k[1], 52.19, epsilon = 1e-9);
        assert_abs_diff_eq!(a[0], 74.0, epsilon = 1e-9);
        assert_abs_diff_eq!(a[1], 59.81, epsilon = 1e-9);
    }

    #[test]
    fn test_quarter_turns() {
        let p = [1.0, 0.0];
        assert_eq!(to_sheet(p, [0.0, 0.0], 0.0), [1.0, 0.0]);
        assert_eq!(to_sheet(p, [0.0, 0.0], 90.0), [0.0, -1.0]);
        assert_eq!(to_sheet(p, [0.0, 0.0], 180.0), [-1.0, 0.0]);
        assert_eq!(to_sheet(p, [0.0, 0.0], -90.0), [0.0, 1.0]);
    }

    #[test]
    fn test_missing_pin() {
        let lib = Library::builtin().unwrap();
        let err = lib.get(LED).unwrap().pin_position("3", [0.0, 0.0], 0.0);
        assert!(matches!(err, Err(SchematicError::MissingPin { .. })));
    }
}
