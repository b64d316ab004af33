mod adhash;
mod equality;
mod mutation;
mod nfr;
