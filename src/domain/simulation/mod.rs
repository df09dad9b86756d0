pub mod simulation_driver;
