pub mod vec3;
