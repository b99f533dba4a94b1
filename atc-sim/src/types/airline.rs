use std::fmt;

/// Category of the aircraft operated by an airline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AircraftType {
    Commercial,
    Cargo,
    Emergency,
}

impl AircraftType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AircraftType::Commercial => "Commercial",
            AircraftType::Cargo => "Cargo",
            AircraftType::Emergency => "Emergency",
        }
    }
}

impl fmt::Display for AircraftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Emergency declared for a flight. `None` for regular traffic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EmergencyType {
    None,
    Military,
    Medical,
    DiversionOrLowFuel,
    Vip,
}

impl EmergencyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyType::None => "None",
            EmergencyType::Military => "Military",
            EmergencyType::Medical => "Medical",
            EmergencyType::DiversionOrLowFuel => "Diversion/Low Fuel",
            EmergencyType::Vip => "VIP",
        }
    }
}

impl fmt::Display for EmergencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Index of an airline inside the [`AirlineTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AirlineId(pub usize);

/// Static reference data about an operator.
#[derive(Debug, Clone, PartialEq)]
pub struct Airline {
    pub name: String,
    pub aircraft_type: AircraftType,
    pub fleet_size: u32,
    pub flights_in_operation: u32,
    /// Emergency subtype this operator is dedicated to, if any.
    pub serves: Option<EmergencyType>,
}

impl Airline {
    pub fn new(
        name: &str,
        aircraft_type: AircraftType,
        fleet_size: u32,
        flights_in_operation: u32,
    ) -> Self {
        Airline {
            name: name.to_string(),
            aircraft_type,
            fleet_size,
            flights_in_operation,
            serves: None,
        }
    }

    /// Marks the airline as the dedicated operator for an emergency subtype.
    pub fn serving(mut self, emergency: EmergencyType) -> Self {
        self.serves = Some(emergency);
        self
    }

    /// Operators flying into the reference airport.
    pub fn default_roster() -> Vec<Airline> {
        vec![
            Airline::new("PIA", AircraftType::Commercial, 6, 4),
            Airline::new("AirBlue", AircraftType::Commercial, 4, 4),
            Airline::new("FedEx Cargo", AircraftType::Cargo, 3, 2),
            Airline::new("Pakistan Airforce", AircraftType::Emergency, 2, 1)
                .serving(EmergencyType::Military),
            Airline::new("Blue Dart Cargo", AircraftType::Cargo, 2, 2),
            Airline::new("AghaKhan Air Ambulance", AircraftType::Emergency, 2, 1)
                .serving(EmergencyType::Medical),
        ]
    }
}

/// Immutable lookup table of airlines. Flights refer to their operator by
/// [`AirlineId`] only.
#[derive(Debug, Clone)]
pub struct AirlineTable {
    airlines: Vec<Airline>,
}

impl AirlineTable {
    pub fn new(airlines: Vec<Airline>) -> Self {
        AirlineTable { airlines }
    }

    pub fn get(&self, id: AirlineId) -> Option<&Airline> {
        self.airlines.get(id.0)
    }

    /// Name of the airline, or `"Unknown"` for an id outside the table.
    pub fn name_of(&self, id: AirlineId) -> &str {
        self.get(id).map_or("Unknown", |airline| airline.name.as_str())
    }

    pub fn find(&self, name: &str) -> Option<AirlineId> {
        self.airlines
            .iter()
            .position(|airline| airline.name == name)
            .map(AirlineId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (AirlineId, &Airline)> {
        self.airlines
            .iter()
            .enumerate()
            .map(|(index, airline)| (AirlineId(index), airline))
    }

    pub fn len(&self) -> usize {
        self.airlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.airlines.is_empty()
    }

    /// Airlines allowed to fly a slot.
    ///
    /// `emergency` is `None` for a regular slot, otherwise the subtype drawn for it:
    /// - Military and Medical are restricted to their dedicated operator.
    /// - Any other emergency may be flown by any Emergency-category airline.
    /// - Regular slots exclude Emergency-category airlines.
    pub fn candidates(&self, emergency: Option<EmergencyType>) -> Vec<AirlineId> {
        self.iter()
            .filter(|(_, airline)| match emergency {
                Some(EmergencyType::Military) => airline.serves == Some(EmergencyType::Military),
                Some(EmergencyType::Medical) => airline.serves == Some(EmergencyType::Medical),
                Some(_) => airline.aircraft_type == AircraftType::Emergency,
                None => airline.aircraft_type != AircraftType::Emergency,
            })
            .map(|(id, _)| id)
            .collect()
    }
}

impl Default for AirlineTable {
    fn default() -> Self {
        AirlineTable::new(Airline::default_roster())
    }
}
