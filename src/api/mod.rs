pub mod experiment_config_dto;
