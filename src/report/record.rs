use serde::Serialize;
use std::fmt;

/// Report grammar, latched once per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Dialect {
    #[default]
    PowerCompiler,
    PrimePower,
}

impl Dialect {
    /// Power fields in the order the dialect's report prints them.
    pub fn fields(self) -> &'static [PowerField] {
        use PowerField::*;
        match self {
            Dialect::PowerCompiler => &[Switching, Internal, Leakage, Total, Pct],
            Dialect::PrimePower => &[Internal, Switching, Leakage, Glitch, XTran, Total, Pct],
        }
    }

    /// Column headers for the power fields followed by the type-name column.
    pub fn headers(self) -> Vec<String> {
        let mut out: Vec<String> = self.fields().iter().map(|f| f.header(self)).collect();
        out.push(TYPE_NAME_HEADER.to_string());
        out
    }

    /// Resolve a column by header text or snake-case key.
    pub fn column(self, name: &str) -> Option<PowerField> {
        let name = name.trim();
        self.fields()
            .iter()
            .copied()
            .find(|f| f.key() == name || f.header(self) == name)
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::PowerCompiler => f.write_str("Power Compiler"),
            Dialect::PrimePower => f.write_str("Prime Power"),
        }
    }
}

pub const TYPE_NAME_HEADER: &str = "Module Type Name";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PowerField {
    Switching,
    Internal,
    Leakage,
    Glitch,
    XTran,
    Total,
    Pct,
}

impl PowerField {
    pub fn key(self) -> &'static str {
        match self {
            PowerField::Switching => "switching_power",
            PowerField::Internal => "internal_power",
            PowerField::Leakage => "leakage_power",
            PowerField::Glitch => "glitch_power",
            PowerField::XTran => "x_tran_power",
            PowerField::Total => "total_power",
            PowerField::Pct => "pct",
        }
    }

    /// Header as written in the emitted tables. Power Compiler reports leakage
    /// in uW and everything else in mW; Prime Power reports watts throughout.
    pub fn header(self, dialect: Dialect) -> String {
        let label = match self {
            PowerField::Switching => "Switching Power",
            PowerField::Internal => "Internal Power",
            PowerField::Leakage => "Leakage Power",
            PowerField::Glitch => "Glitch Power",
            PowerField::XTran => "X-tran Power",
            PowerField::Total => "Total Power",
            PowerField::Pct => return "Pct of Total Power".to_string(),
        };
        let unit = match (dialect, self) {
            (Dialect::PowerCompiler, PowerField::Leakage) => "uW",
            (Dialect::PowerCompiler, _) => "mW",
            (Dialect::PrimePower, _) => "W",
        };
        format!("{} ({})", label, unit)
    }
}

/// Peak power and the time window it was observed in (Prime Power only).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakPower {
    pub power: f64,
    pub window: (f64, f64),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "dialect", rename_all = "snake_case")]
pub enum PowerFigures {
    PowerCompiler {
        switching: f64,
        internal: f64,
        leakage: f64,
        total: f64,
        pct: f64,
    },
    PrimePower {
        internal: f64,
        switching: f64,
        leakage: f64,
        glitch: f64,
        x_tran: f64,
        total: f64,
        pct: f64,
        peak: Option<PeakPower>,
    },
}

/// One instance line of the hierarchy section.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerRecord {
    pub instance_name: String,
    /// Module type from the parenthesized suffix; empty when absent.
    pub type_name: String,
    pub figures: PowerFigures,
}

impl PowerRecord {
    pub fn dialect(&self) -> Dialect {
        match self.figures {
            PowerFigures::PowerCompiler { .. } => Dialect::PowerCompiler,
            PowerFigures::PrimePower { .. } => Dialect::PrimePower,
        }
    }

    pub fn get(&self, field: PowerField) -> Option<f64> {
        match (&self.figures, field) {
            (PowerFigures::PowerCompiler { switching, .. }, PowerField::Switching) => Some(*switching),
            (PowerFigures::PowerCompiler { internal, .. }, PowerField::Internal) => Some(*internal),
            (PowerFigures::PowerCompiler { leakage, .. }, PowerField::Leakage) => Some(*leakage),
            (PowerFigures::PowerCompiler { total, .. }, PowerField::Total) => Some(*total),
            (PowerFigures::PowerCompiler { pct, .. }, PowerField::Pct) => Some(*pct),
            (PowerFigures::PowerCompiler { .. }, _) => None,
            (PowerFigures::PrimePower { switching, .. }, PowerField::Switching) => Some(*switching),
            (PowerFigures::PrimePower { internal, .. }, PowerField::Internal) => Some(*internal),
            (PowerFigures::PrimePower { leakage, .. }, PowerField::Leakage) => Some(*leakage),
            (PowerFigures::PrimePower { glitch, .. }, PowerField::Glitch) => Some(*glitch),
            (PowerFigures::PrimePower { x_tran, .. }, PowerField::XTran) => Some(*x_tran),
            (PowerFigures::PrimePower { total, .. }, PowerField::Total) => Some(*total),
            (PowerFigures::PrimePower { pct, .. }, PowerField::Pct) => Some(*pct),
        }
    }

    /// Power fields in the dialect's declared order.
    pub fn values(&self) -> Vec<f64> {
        self.dialect()
            .fields()
            .iter()
            .filter_map(|f| self.get(*f))
            .collect()
    }
}

impl fmt::Display for PowerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dialect = self.dialect();
        let parts: Vec<String> = dialect
            .fields()
            .iter()
            .zip(self.values())
            .map(|(field, v)| format!("{}: {}", field.header(dialect), v))
            .collect();
        write!(f, "{}\t{}", self.instance_name, parts.join("\t"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn prime(pct: f64) -> PowerRecord {
        PowerRecord {
            instance_name: "u_core".to_string(),
            type_name: "core".to_string(),
            figures: PowerFigures::PrimePower {
                internal: 1.0,
                switching: 2.0,
                leakage: 3.0,
                glitch: 4.0,
                x_tran: 5.0,
                total: 15.0,
                pct,
                peak: None,
            },
        }
    }

    #[test]
    fn prime_power_values_follow_report_order() {
        assert_eq!(prime(42.0).values(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 15.0, 42.0]);
    }

    #[test]
    fn power_compiler_has_no_glitch_column() {
        let rec = PowerRecord {
            instance_name: "top".to_string(),
            type_name: String::new(),
            figures: PowerFigures::PowerCompiler {
                switching: 1.5,
                internal: 2.5,
                leakage: 300.0,
                total: 4.3,
                pct: 100.0,
            },
        };
        assert_eq!(rec.get(PowerField::Glitch), None);
        assert_eq!(rec.values(), vec![1.5, 2.5, 300.0, 4.3, 100.0]);
    }

    #[test]
    fn dialect_names_agree_in_json() {
        let rec = serde_json::to_value(prime(1.0)).unwrap();
        assert_eq!(rec["figures"]["dialect"], serde_json::json!("prime_power"));
        assert_eq!(
            serde_json::to_value(prime(1.0).dialect()).unwrap(),
            rec["figures"]["dialect"]
        );
    }

    #[test]
    fn headers_carry_units_and_type_column() {
        assert_eq!(
            Dialect::PowerCompiler.headers(),
            vec![
                "Switching Power (mW)",
                "Internal Power (mW)",
                "Leakage Power (uW)",
                "Total Power (mW)",
                "Pct of Total Power",
                "Module Type Name",
            ]
        );
        assert_eq!(Dialect::PrimePower.headers()[4], "X-tran Power (W)");
    }

    #[test]
    fn columns_resolve_by_key_or_header() {
        assert_eq!(Dialect::PrimePower.column("glitch_power"), Some(PowerField::Glitch));
        assert_eq!(
            Dialect::PowerCompiler.column("Pct of Total Power"),
            Some(PowerField::Pct)
        );
        assert_eq!(Dialect::PowerCompiler.column("glitch_power"), None);
    }
}
