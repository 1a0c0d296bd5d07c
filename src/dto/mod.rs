pub mod exam_dto;
