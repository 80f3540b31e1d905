mod calc;
mod compare;
mod config;
mod correlation;
mod describe;
mod error;
mod file;
mod frame;
mod plot;
mod report;
mod select;
mod wilcoxon;

pub use crate::{
    calc::*, compare::*, config::*, correlation::*, describe::*, error::*, file::*, frame::*,
    plot::*, report::*, select::*, wilcoxon::*,
};
