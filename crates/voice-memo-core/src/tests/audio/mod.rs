mod capture;
mod meter;
