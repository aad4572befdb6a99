pub mod i2c_bitbang;
