pub mod capacity_model;
