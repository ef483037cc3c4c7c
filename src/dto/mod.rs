pub mod results_dto;
