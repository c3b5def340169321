pub mod pixel;
pub mod smart_pixel;
pub mod frame;
pub mod motion_detector;
pub mod region;
pub mod skin_detector;
pub mod pattern_analyzer;
pub mod behavior;
pub mod alert_controller;
pub mod risk;
