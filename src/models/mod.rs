pub mod dog;
pub mod petfinder;
pub mod results;
