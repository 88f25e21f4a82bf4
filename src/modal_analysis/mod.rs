pub mod displacement;   // Modal superposition of mode shapes
pub mod ibpa;           // Interblade phase angles from nodal diameters
