mod occupancy;

pub use self::occupancy::Occupancy;
