pub mod shared {
    pub mod bounding_box;
    pub mod constants;
    pub mod frame;
    pub mod model_resolver;
}

pub mod capture {
    pub mod domain {
        pub mod camera_source;
    }
    pub mod infrastructure;
}

pub mod recognition {
    pub mod domain {
        pub mod face_detection;
        pub mod face_matcher;
        pub mod known_face_set;
    }
    pub mod infrastructure;
}

pub mod enrollment {
    pub mod enroll_faces_use_case;
}

pub mod pipeline {
    pub mod detection_queue;
    pub mod detection_worker;
    pub mod lifecycle_controller;
    pub mod overlay;
    pub mod pipeline_config;
    pub mod pipeline_context;
    pub mod published_state;
    pub mod stream_generator;
}

#[cfg(test)]
pub(crate) mod testing;
