use time::OffsetDateTime;
use uuid::Uuid;

/// Which of the three value sheets a sample comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Gross,
    Net,
    Shared,
}

/// Energy direction of a metered column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Energy taken from the grid ("Withdrawal" columns).
    Consumption,
    /// Energy fed into the grid.
    Injection,
}

/// Six energy channels for one timestamp: gross/net/shared consumption and
/// gross/net/shared injection, all in kWh. A channel is `None` until a sheet
/// provides a value for it.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConsumptionVector {
    pub gross_consumption: Option<f64>,
    pub net_consumption: Option<f64>,
    pub shared_consumption: Option<f64>,
    pub gross_injection: Option<f64>,
    pub net_injection: Option<f64>,
    pub shared_injection: Option<f64>,
}

impl ConsumptionVector {
    fn channel_mut(&mut self, kind: ValueKind, direction: Direction) -> &mut Option<f64> {
        match (kind, direction) {
            (ValueKind::Gross, Direction::Consumption) => &mut self.gross_consumption,
            (ValueKind::Net, Direction::Consumption) => &mut self.net_consumption,
            (ValueKind::Shared, Direction::Consumption) => &mut self.shared_consumption,
            (ValueKind::Gross, Direction::Injection) => &mut self.gross_injection,
            (ValueKind::Net, Direction::Injection) => &mut self.net_injection,
            (ValueKind::Shared, Direction::Injection) => &mut self.shared_injection,
        }
    }

    pub fn channel(&self, kind: ValueKind, direction: Direction) -> Option<f64> {
        match (kind, direction) {
            (ValueKind::Gross, Direction::Consumption) => self.gross_consumption,
            (ValueKind::Net, Direction::Consumption) => self.net_consumption,
            (ValueKind::Shared, Direction::Consumption) => self.shared_consumption,
            (ValueKind::Gross, Direction::Injection) => self.gross_injection,
            (ValueKind::Net, Direction::Injection) => self.net_injection,
            (ValueKind::Shared, Direction::Injection) => self.shared_injection,
        }
    }

    /// Add a sample into the channel's running sum (operation aggregate).
    pub fn add_sample(&mut self, kind: ValueKind, direction: Direction, value: f64) {
        let slot = self.channel_mut(kind, direction);
        *slot = Some(slot.unwrap_or(0.0) + value);
    }

    /// Overwrite the channel (per-meter reading, one value per sheet/column).
    pub fn set_sample(&mut self, kind: ValueKind, direction: Direction, value: f64) {
        *self.channel_mut(kind, direction) = Some(value);
    }

    /// Overlay every populated channel of `other` onto `self`, leaving
    /// channels `other` did not provide untouched. Used when re-ingestion
    /// updates an existing stored record.
    pub fn merge_from(&mut self, other: &ConsumptionVector) {
        for (kind, direction) in Self::CHANNELS {
            if let Some(v) = other.channel(kind, direction) {
                *self.channel_mut(kind, direction) = Some(v);
            }
        }
    }

    pub const CHANNELS: [(ValueKind, Direction); 6] = [
        (ValueKind::Gross, Direction::Consumption),
        (ValueKind::Net, Direction::Consumption),
        (ValueKind::Shared, Direction::Consumption),
        (ValueKind::Gross, Direction::Injection),
        (ValueKind::Net, Direction::Injection),
        (ValueKind::Shared, Direction::Injection),
    ];
}

/// Aggregate record: sums across every authorized meter of the operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationConsumption {
    pub operation_id: Uuid,
    pub ts: OffsetDateTime,
    pub values: ConsumptionVector,
}

/// Per-meter record: one meter's own readings at one timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct MeterConsumption {
    pub ean: String,
    pub ts: OffsetDateTime,
    pub values: ConsumptionVector,
}
