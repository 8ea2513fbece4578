pub type ClinicParams = biyo_axum::params::RestParams;
