//! Class-of-supply taxonomy.

use std::fmt;

use serde::Serialize;

/// A class-of-supply code such as `4` (maintenance) or `4011` (spares).
///
/// Only codes listed in the catalog can be constructed. Subclass
/// relationships follow decimal-digit prefixes, except that class 10
/// participates in none.
///
/// # Examples
///
/// ```
/// use space_logistics_sim::domain::ClassOfSupply;
///
/// let spares = ClassOfSupply::from_id(401).unwrap();
/// assert!(spares.is_subclass_of(ClassOfSupply::COS4));
/// assert!(!ClassOfSupply::COS10.is_subclass_of(ClassOfSupply::COS1));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ClassOfSupply(u16);

const CATALOG: &[(u16, &str)] = &[
    (0, "None"),
    (1, "Propellants and Fuels"),
    (2, "Crew Provisions"),
    (3, "Crew Operations"),
    (4, "Maintenance and Upkeep"),
    (5, "Stowage and Restraint"),
    (6, "Exploration and Research"),
    (7, "Waste and Disposal"),
    (8, "Habitation and Infrastructure"),
    (9, "Transportation and Carriers"),
    (10, "Miscellaneous"),
    (101, "Cryogens"),
    (102, "Hypergols"),
    (103, "Nuclear Fuel"),
    (104, "Petroleum Fuels"),
    (105, "Other Fuels"),
    (106, "Green Propellant"),
    (201, "Water and Support Equipment"),
    (202, "Food and Support Equipment"),
    (203, "Gases"),
    (204, "Hygiene Items"),
    (205, "Clothing"),
    (206, "Personal Items"),
    (301, "Office Equipment and Supplies"),
    (302, "EVA Equipment and Consumables"),
    (303, "Health Equipment and Consumables"),
    (304, "Safety Equipment"),
    (305, "Communications Equipment"),
    (306, "Computers and Support Equipment"),
    (401, "Spares and Repair Parts"),
    (402, "Maintenance Tools"),
    (403, "Lubricants and Bulk Chemicals"),
    (404, "Batteries"),
    (405, "Cleaning Equipment and Consumables"),
    (501, "Cargo Containers and Restraints"),
    (502, "Inventory Management Equipment"),
    (601, "Science Payloads and Instruments"),
    (602, "Field Equipment"),
    (603, "Samples"),
    (701, "Waste"),
    (702, "Waste Management Equipment"),
    (703, "Failed Parts"),
    (801, "Habitation Facilities"),
    (802, "Surface Mobility Systems"),
    (803, "Power Systems"),
    (804, "Robotic Systems"),
    (805, "Resource Utilization Systems"),
    (806, "Orbiting Service Systems"),
    (901, "Carriers, Non-propulsive Elements"),
    (902, "Propulsive Elements"),
    (4011, "Spares"),
    (4012, "Repair Parts"),
    (8041, "Science Robotics"),
    (8042, "Construction/Maintenance Robotics"),
    (9021, "Launch Vehicles"),
    (9022, "Upper Stages/In-Space Propulsion Systems"),
    (9023, "Descent Stages"),
    (9024, "Ascent Stages"),
];

impl ClassOfSupply {
    pub const COS0: Self = Self(0);
    pub const COS1: Self = Self(1);
    pub const COS2: Self = Self(2);
    pub const COS3: Self = Self(3);
    pub const COS4: Self = Self(4);
    pub const COS5: Self = Self(5);
    pub const COS6: Self = Self(6);
    pub const COS7: Self = Self(7);
    pub const COS8: Self = Self(8);
    pub const COS9: Self = Self(9);
    pub const COS10: Self = Self(10);
    pub const COS201: Self = Self(201);
    pub const COS203: Self = Self(203);
    pub const COS4011: Self = Self(4011);

    /// Looks up a class by its numeric code.
    pub fn from_id(id: u16) -> Option<Self> {
        CATALOG.iter().any(|&(c, _)| c == id).then_some(Self(id))
    }

    /// All known classes in catalog order.
    pub fn all() -> impl Iterator<Item = Self> {
        CATALOG.iter().map(|&(id, _)| Self(id))
    }

    pub fn id(self) -> u16 {
        self.0
    }

    pub fn name(self) -> &'static str {
        CATALOG
            .iter()
            .find(|&&(id, _)| id == self.0)
            .map_or("Unknown", |&(_, name)| name)
    }

    /// Returns `true` if `self` is a strict subclass of `superclass`.
    ///
    /// A shorter code is a superclass of every longer code it prefixes.
    /// Class 10 is excluded on both sides: `1` would otherwise prefix
    /// `10`, and `10` would prefix nothing meaningful.
    pub fn is_subclass_of(self, superclass: Self) -> bool {
        let sub = self.0.to_string();
        let sup = superclass.0.to_string();
        if sup.len() >= sub.len() || self.0 == 10 || superclass.0 == 10 {
            return false;
        }
        sub.starts_with(&sup)
    }

    pub fn is_superclass_of(self, subclass: Self) -> bool {
        subclass.is_subclass_of(self)
    }

    /// Returns `true` if `self` equals `class` or is a subclass of it.
    pub fn is_instance_of(self, class: Self) -> bool {
        self == class || self.is_subclass_of(class)
    }

    /// The top-level class (0-10) this class belongs to.
    pub fn base_class(self) -> Self {
        (0..=10)
            .map(Self)
            .find(|&base| self.is_instance_of(base))
            .unwrap_or(Self::COS0)
    }
}

impl fmt::Display for ClassOfSupply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.0, self.name())
    }
}
