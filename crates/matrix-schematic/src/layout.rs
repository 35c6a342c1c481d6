//! Switch matrix placement.
//!
//! Column and row nets are sorted by name and numbered; that numbering is
//! the only thing deciding where a key lands on the sheet. Every position
//! below is derived from the two bus coordinates of a key, and bus extents
//! are computed from the same pin geometry used to draw the parts.
//!
//! ```text
//!   col bus            row label
//!      |  S1 o--o             :
//!      +--1  2 \  K (D1, 270°)
//!      |        \ |
//!      |          A
//!   ---+----------*---------- row bus
//! ```
//!
//! Signal flow per key: column bus → switch pin 1 → switch pin 2 → diode
//! anode → diode cathode → row bus.

use std::collections::BTreeSet;
use std::path::Path;

use log::info;

use crate::error::SchematicError;
use crate::schematic::library::{Library, DIODE, LED, SWITCH};
use crate::schematic::{FieldEffects, Justify, Schematic};
use crate::types::KeyRecord;

/// Where column 0 / row 0 buses sit.
pub const BUS_ORIGIN: [f64; 2] = [60.0, 60.0];
pub const COLUMN_SPACING: f64 = 16.0;
pub const ROW_SPACING: f64 = 16.0;

/// Switch position relative to the intersection of its buses.
pub const SWITCH_OFFSET: [f64; 2] = [6.0, -8.0];
/// Diode position relative to its switch.
pub const DIODE_OFFSET: [f64; 2] = [8.0, 4.0];
pub const DIODE_ROTATION: f64 = 270.0;

/// Column buses start here and run down to their lowest switch.
pub const COLUMN_BUS_TOP: f64 = 35.0;
/// Row buses end this far right of the last column.
pub const ROW_BUS_MARGIN: f64 = 30.0;

pub const LEDS_PER_ROW: usize = 15;
pub const LED_ORIGIN: [f64; 2] = [50.0, 250.0];
pub const LED_SPACING: [f64; 2] = [16.0, 20.0];
/// The bottom LED of a pair sits this far above the top one.
pub const LED_PAIR_OFFSET: f64 = 5.0;

/// Switch pin wired to the column bus; the other one goes to the diode.
const SWITCH_COLUMN_PIN: &str = "1";
const SWITCH_DIODE_PIN: &str = "2";
/// Device:D pin 2 is the anode, pin 1 the cathode. Rotated 270° the
/// cathode ends up on top.
const DIODE_ANODE_PIN: &str = "2";
const DIODE_CATHODE_PIN: &str = "1";

// ─── Net numbering ───────────────────────────────────────────────────

/// Distinct net names in lexicographic order; a net's position in the list
/// is its matrix index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetIndex {
    nets: Vec<String>,
}

impl NetIndex {
    pub fn new<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let set: BTreeSet<&str> = names.into_iter().collect();
        Self {
            nets: set.into_iter().map(str::to_string).collect(),
        }
    }

    pub fn index(&self, net: &str) -> Option<usize> {
        self.nets
            .binary_search_by(|n| n.as_str().cmp(net))
            .ok()
    }

    pub fn names(&self) -> &[String] {
        &self.nets
    }

    pub fn len(&self) -> usize {
        self.nets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }
}

pub fn column_bus_x(column: usize) -> f64 {
    BUS_ORIGIN[0] + column as f64 * COLUMN_SPACING
}

pub fn row_bus_y(row: usize) -> f64 {
    BUS_ORIGIN[1] + row as f64 * ROW_SPACING
}

/// x where every row bus ends and row labels sit.
pub fn row_bus_right(columns: usize) -> f64 {
    column_bus_x(columns) + ROW_BUS_MARGIN
}

// ─── Placement ───────────────────────────────────────────────────────

/// Everything drawn for one key.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyPlacement {
    /// 1-based position in the board's key list; the designator suffix.
    pub number: usize,
    pub name: String,
    pub column_net: String,
    pub row_net: String,
    pub column: usize,
    pub row: usize,
    pub column_bus_x: f64,
    pub row_bus_y: f64,
    pub switch: [f64; 2],
    pub diode: [f64; 2],
    pub switch_column_pin: [f64; 2],
    pub switch_diode_pin: [f64; 2],
    pub diode_anode: [f64; 2],
    pub diode_cathode: [f64; 2],
    pub led_top: [f64; 2],
    pub led_bottom: [f64; 2],
}

impl KeyPlacement {
    pub fn switch_ref(&self) -> String {
        format!("S{}", self.number)
    }

    pub fn diode_ref(&self) -> String {
        format!("D{}", self.number)
    }

    pub fn led_top_ref(&self) -> String {
        format!("LEDT{}", self.number)
    }

    pub fn led_bottom_ref(&self) -> String {
        format!("LEDB{}", self.number)
    }

    /// Where the switch stub meets the column bus.
    pub fn column_tap(&self) -> [f64; 2] {
        [self.column_bus_x, self.switch_column_pin[1]]
    }

    /// Where the diode stub meets the row bus.
    pub fn row_tap(&self) -> [f64; 2] {
        [self.diode_cathode[0], self.row_bus_y]
    }
}

/// A straight bus wire and the taps joined to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Bus {
    pub net: String,
    pub start: [f64; 2],
    pub end: [f64; 2],
    pub junctions: Vec<[f64; 2]>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NetLabel {
    pub net: String,
    pub position: [f64; 2],
}

/// The complete drawing plan for one board.
#[derive(Debug, Clone, PartialEq)]
pub struct MatrixLayout {
    pub board: String,
    pub columns: NetIndex,
    pub rows: NetIndex,
    pub keys: Vec<KeyPlacement>,
    pub column_buses: Vec<Bus>,
    pub row_buses: Vec<Bus>,
    pub labels: Vec<NetLabel>,
}

/// Compute every position for `keys`. Pin positions come from `library`.
pub fn plan(
    board: &str,
    keys: &[KeyRecord],
    library: &Library,
) -> Result<MatrixLayout, SchematicError> {
    let columns = NetIndex::new(keys.iter().map(|k| k.column_net.as_str()));
    let rows = NetIndex::new(keys.iter().map(|k| k.row_net.as_str()));
    let switch_sym = library.get(SWITCH)?;
    let diode_sym = library.get(DIODE)?;

    let mut placements = Vec::with_capacity(keys.len());
    for (idx, key) in keys.iter().enumerate() {
        let column = columns.index(&key.column_net).ok_or_else(|| missing_net(&key.column_net))?;
        let row = rows.index(&key.row_net).ok_or_else(|| missing_net(&key.row_net))?;
        let bus_x = column_bus_x(column);
        let bus_y = row_bus_y(row);

        let switch = [bus_x + SWITCH_OFFSET[0], bus_y + SWITCH_OFFSET[1]];
        let diode = [switch[0] + DIODE_OFFSET[0], switch[1] + DIODE_OFFSET[1]];

        let led_x = LED_ORIGIN[0] + (idx % LEDS_PER_ROW) as f64 * LED_SPACING[0];
        let led_y = LED_ORIGIN[1] + (idx / LEDS_PER_ROW) as f64 * LED_SPACING[1];

        placements.push(KeyPlacement {
            number: idx + 1,
            name: key.name.clone(),
            column_net: key.column_net.clone(),
            row_net: key.row_net.clone(),
            column,
            row,
            column_bus_x: bus_x,
            row_bus_y: bus_y,
            switch,
            diode,
            switch_column_pin: switch_sym.pin_position(SWITCH_COLUMN_PIN, switch, 0.0)?,
            switch_diode_pin: switch_sym.pin_position(SWITCH_DIODE_PIN, switch, 0.0)?,
            diode_anode: diode_sym.pin_position(DIODE_ANODE_PIN, diode, DIODE_ROTATION)?,
            diode_cathode: diode_sym.pin_position(DIODE_CATHODE_PIN, diode, DIODE_ROTATION)?,
            led_top: [led_x, led_y],
            led_bottom: [led_x, led_y - LED_PAIR_OFFSET],
        });
    }

    let column_buses = columns
        .names()
        .iter()
        .enumerate()
        .filter_map(|(col, net)| {
            let taps: Vec<[f64; 2]> = placements
                .iter()
                .filter(|p| p.column == col)
                .map(KeyPlacement::column_tap)
                .collect();
            let lowest = taps.iter().map(|t| t[1]).reduce(f64::max)?;
            let x = column_bus_x(col);
            Some(Bus {
                net: net.clone(),
                start: [x, COLUMN_BUS_TOP],
                end: [x, lowest],
                junctions: taps,
            })
        })
        .collect();

    let right = row_bus_right(columns.len());
    let row_buses = rows
        .names()
        .iter()
        .enumerate()
        .filter_map(|(row, net)| {
            let taps: Vec<[f64; 2]> = placements
                .iter()
                .filter(|p| p.row == row)
                .map(KeyPlacement::row_tap)
                .collect();
            let leftmost = taps.iter().map(|t| t[0]).reduce(f64::min)?;
            let y = row_bus_y(row);
            Some(Bus {
                net: net.clone(),
                start: [leftmost, y],
                end: [right, y],
                junctions: taps,
            })
        })
        .collect();

    // Labels follow the order nets first show up in the key list.
    let mut labels: Vec<NetLabel> = Vec::new();
    for p in &placements {
        if !labels.iter().any(|l| l.net == p.column_net) {
            labels.push(NetLabel {
                net: p.column_net.clone(),
                position: [p.column_bus_x, COLUMN_BUS_TOP],
            });
        }
    }
    let column_label_count = labels.len();
    for p in &placements {
        if !labels[column_label_count..].iter().any(|l| l.net == p.row_net) {
            labels.push(NetLabel {
                net: p.row_net.clone(),
                position: [right, p.row_bus_y],
            });
        }
    }

    Ok(MatrixLayout {
        board: board.to_string(),
        columns,
        rows,
        keys: placements,
        column_buses,
        row_buses,
        labels,
    })
}

fn missing_net(net: &str) -> SchematicError {
    SchematicError::ParseError(format!("net {net} missing from matrix index"))
}

/// Draw a planned layout onto `sch`.
pub fn render(layout: &MatrixLayout, sch: &mut Schematic) -> Result<(), SchematicError> {
    for key in &layout.keys {
        let sw = sch.add_component(SWITCH, &key.switch_ref(), key.switch, 0.0)?;
        sw.set_field_effects(
            "Reference",
            FieldEffects {
                position: [key.switch[0], key.switch[1] - 5.0],
                rotation: 0.0,
                justify: None,
            },
        );

        let d = sch.add_component(DIODE, &key.diode_ref(), key.diode, DIODE_ROTATION)?;
        d.set_field_effects(
            "Reference",
            FieldEffects {
                position: [key.diode[0] - 2.0, key.diode[1]],
                rotation: 90.0,
                justify: Some(Justify::Right),
            },
        );

        sch.add_wire(key.switch_column_pin, key.column_tap());
        sch.add_wire(key.switch_diode_pin, key.diode_anode);
        sch.add_wire(key.diode_cathode, key.row_tap());

        sch.add_component(LED, &key.led_top_ref(), key.led_top, 0.0)?;
        sch.add_component(LED, &key.led_bottom_ref(), key.led_bottom, 0.0)?;
    }

    for bus in layout.column_buses.iter().chain(&layout.row_buses) {
        sch.add_wire(bus.start, bus.end);
        for &junction in &bus.junctions {
            sch.add_junction(junction);
        }
    }

    for label in &layout.labels {
        sch.add_label(&label.net, label.position);
    }

    Ok(())
}

/// Plan, draw and save one board's schematic.
pub fn generate_matrix_schematic(
    keys: &[KeyRecord],
    board: &str,
    output_path: &Path,
) -> Result<MatrixLayout, SchematicError> {
    let library = Library::builtin()?;
    let layout = plan(board, keys, &library)?;
    let mut sch = Schematic::new(board, library);
    render(&layout, &mut sch)?;
    sch.save(output_path)?;
    info!("Generated schematic: {}", output_path.display());
    Ok(layout)
}
